//! Stateful engine over the pure transition layer.
//!
//! Holds the committed world and the rules. A command is applied to a
//! clone; the clone replaces the committed world only once it has passed
//! the structural invariants and, for inventory/legion moves, resource
//! conservation.

use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::commands::{Actor, Command, Invest};
use crate::config::GameRules;
use crate::domain::{FactionId, World};
use crate::economy::{faction_report, EconomicReport};
use crate::error::LedgerError;
use crate::hashing::canonical_hash;
use crate::invariants::{check_conservation, try_validate_invariants, InvariantViolation};
use crate::investment::{self, DiceRoller, InvestmentQuote};
use crate::transitions::{apply_command, CommandOutcome};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Expected rejection; the world is unchanged.
    #[error(transparent)]
    Rejected(#[from] LedgerError),
    /// The command produced a world that breaks a structural rule.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    world: World,
    rules: GameRules,
}

impl GameEngine {
    /// Wrap an existing world; it must already satisfy the invariants.
    pub fn new(world: World, rules: GameRules) -> Result<Self, InvariantViolation> {
        try_validate_invariants(&world, rules.max_action_points)?;
        Ok(Self { world, rules })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Validate, then apply, one command.
    pub fn apply(
        &mut self,
        actor: &Actor,
        command: &Command,
        dice: &mut dyn DiceRoller,
    ) -> Result<CommandOutcome, EngineError> {
        let span = info_span!("command", action = command.action_name(), actor = %actor.label());
        let _guard = span.enter();
        debug!(?command, "dispatch");

        let (next, outcome) = apply_command(&self.world, &self.rules, actor, command, dice)
            .map_err(|e| {
                warn!(kind = ?e.kind(), error = %e, "rejected");
                e
            })?;

        try_validate_invariants(&next, self.rules.max_action_points).map_err(|v| {
            error!(rule = v.rule, detail = %v.detail, "candidate world breaks an invariant");
            v
        })?;
        if command.conserves_resources() {
            check_conservation(&self.world, &next).map_err(|v| {
                error!(detail = %v.detail, "resources were created or destroyed");
                v
            })?;
        }

        self.world = next;
        info!(year = self.world.current_year(), "committed");
        Ok(outcome)
    }

    /// Swap in a whole world, e.g. from a snapshot. Rejected worlds leave
    /// the current one in place.
    pub fn replace_world(&mut self, world: World) -> Result<(), InvariantViolation> {
        try_validate_invariants(&world, self.rules.max_action_points)?;
        self.world = world;
        Ok(())
    }

    pub fn economic_report(&self, faction_id: &FactionId) -> Result<EconomicReport, LedgerError> {
        faction_report(&self.world, faction_id)
    }

    pub fn investment_preview(
        &self,
        faction_id: &FactionId,
        request: &Invest,
    ) -> Result<InvestmentQuote, LedgerError> {
        investment::preview(&self.world, &self.rules, faction_id, request)
    }

    pub fn world_hash(&self) -> Result<String, serde_json::Error> {
        canonical_hash(&self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CreateLegion, EquipmentRequest};
    use crate::domain::Equipment;
    use crate::investment::FixedRoll;
    use crate::state::{demo_world, WorldBuilder};

    fn engine() -> GameEngine {
        GameEngine::new(demo_world(), GameRules::default()).unwrap()
    }

    #[test]
    fn rejected_command_leaves_world_alone() {
        let mut engine = engine();
        let before = engine.world().clone();
        let err = engine
            .apply(
                &Actor::player("oda"),
                &Command::RecruitSoldiers { count: 1_000_000 },
                &mut FixedRoll(50),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Rejected(_)));
        assert_eq!(engine.world(), &before);
    }

    #[test]
    fn committed_command_is_visible() {
        let mut engine = engine();
        let outcome = engine
            .apply(
                &Actor::player("oda"),
                &Command::CreateLegion(CreateLegion {
                    name: "黒母衣衆".into(),
                    commander_id: "hideyoshi".into(),
                    soldiers: 200,
                    equipment: EquipmentRequest {
                        rifles: 20,
                        horses: 10,
                        cannons: 0,
                    },
                    location_id: "tsushima".into(),
                    force_reassign: false,
                }),
                &mut FixedRoll(50),
            )
            .unwrap();
        let CommandOutcome::LegionCreated(created) = outcome else {
            panic!("unexpected outcome");
        };
        assert!(engine.world().legions.contains_key(&created.legion.id));
        assert_eq!(
            engine.world().factions[&FactionId::new("oda")].idle_soldiers,
            1_000
        );
    }

    #[test]
    fn invalid_world_is_refused() {
        let mut broken = WorldBuilder::new()
            .faction("oda", "Oda")
            .territory("kiyosu", "Owari", 1_000, Some("oda"))
            .samurai("nobunaga", "Oda Nobunaga", Some("oda"), 90, 80)
            .legion("l1", "赤備", "nobunaga", 10, Equipment::default(), "kiyosu")
            .build();
        broken.legions.values_mut().for_each(|l| l.soldiers = 0);
        assert!(GameEngine::new(broken.clone(), GameRules::default()).is_err());

        let mut engine = engine();
        let hash = engine.world_hash().unwrap();
        assert!(engine.replace_world(broken).is_err());
        assert_eq!(engine.world_hash().unwrap(), hash);
    }

    #[test]
    fn preview_does_not_mutate() {
        let engine = engine();
        let quote = engine
            .investment_preview(
                &FactionId::new("oda"),
                &Invest {
                    samurai_id: "hideyoshi".into(),
                    track: crate::bands::InvestmentTrack::Commerce,
                    amount: Some(5_000),
                },
            )
            .unwrap();
        assert!(quote.usable);
        assert_eq!(quote.base_points, 5);
        assert_eq!(engine.world(), &demo_world());
    }
}
