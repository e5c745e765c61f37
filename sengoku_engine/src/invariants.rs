//! Structural invariant checks.
//!
//! Run by the engine on every candidate world before it is committed, and
//! by snapshot restore on every decoded world before it replaces the live
//! one. A violation here is a bug or a corrupt document, never a user
//! error, so the checks stop at the first failure and report which rule
//! broke.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::domain::{
    FactionId, SamuraiId, World, CASTLE_LEVELS, MAX_INVESTMENT_POINTS, MAX_SPECIAL_PRODUCTS,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violation [{rule}]: {detail}")]
pub struct InvariantViolation {
    pub rule: &'static str,
    pub detail: String,
}

fn violation(rule: &'static str, detail: impl Into<String>) -> InvariantViolation {
    InvariantViolation {
        rule,
        detail: detail.into(),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every check; `Err` on the first failure.
pub fn try_validate_invariants(
    world: &World,
    max_action_points: u8,
) -> Result<(), InvariantViolation> {
    check_clock(world)?;
    check_faction_lists(world)?;
    check_territories(world)?;
    check_legions(world)?;
    check_commanders(world)?;
    check_samurai(world, max_action_points)?;
    check_investment_bounds(world)?;
    Ok(())
}

/// Soldiers, equipment and treasury a faction holds, idle plus assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceTotals {
    pub soldiers: u64,
    pub rifles: u64,
    pub horses: u64,
    pub cannons: u64,
    pub treasury: u64,
}

impl ResourceTotals {
    /// Totals for every faction in the world.
    pub fn of_world(world: &World) -> BTreeMap<FactionId, ResourceTotals> {
        let mut totals: BTreeMap<FactionId, ResourceTotals> = world
            .factions
            .values()
            .map(|f| {
                (
                    f.id.clone(),
                    ResourceTotals {
                        soldiers: f.idle_soldiers,
                        rifles: f.equipment.rifles,
                        horses: f.equipment.horses,
                        cannons: f.equipment.cannons,
                        treasury: f.treasury,
                    },
                )
            })
            .collect();
        for legion in world.legions.values() {
            let t = totals.entry(legion.faction_id.clone()).or_default();
            t.soldiers += legion.soldiers;
            t.rifles += legion.equipment.rifles;
            t.horses += legion.equipment.horses;
            t.cannons += legion.equipment.cannons;
        }
        totals
    }
}

/// Fails if any faction's totals differ between two worlds.
pub fn check_conservation(before: &World, after: &World) -> Result<(), InvariantViolation> {
    let old = ResourceTotals::of_world(before);
    let new = ResourceTotals::of_world(after);
    if old == new {
        return Ok(());
    }
    let faction = old
        .keys()
        .chain(new.keys())
        .find(|id| old.get(*id) != new.get(*id))
        .map(|id| id.to_string())
        .unwrap_or_default();
    Err(violation(
        "resource_conservation",
        format!("totals of faction {faction:?} changed"),
    ))
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

fn check_clock(world: &World) -> Result<(), InvariantViolation> {
    if world.game_state.current_year == 0 {
        return Err(violation("clock", "current year must be at least 1"));
    }
    Ok(())
}

/// Faction ID lists and the entities' back-references agree both ways.
fn check_faction_lists(world: &World) -> Result<(), InvariantViolation> {
    for faction in world.factions.values() {
        for id in &faction.territory_ids {
            let owner = world.territories.get(id).and_then(|t| t.owner.as_ref());
            if owner != Some(&faction.id) {
                return Err(violation(
                    "territory_ownership",
                    format!("faction {} lists territory {id} it does not own", faction.id),
                ));
            }
        }
        for id in &faction.samurai_ids {
            let member = world.samurai.get(id).and_then(|s| s.faction_id.as_ref());
            if member != Some(&faction.id) {
                return Err(violation(
                    "samurai_membership",
                    format!("faction {} lists samurai {id} outside it", faction.id),
                ));
            }
        }
        for id in &faction.legion_ids {
            let owner = world.legions.get(id).map(|l| &l.faction_id);
            if owner != Some(&faction.id) {
                return Err(violation(
                    "legion_membership",
                    format!("faction {} lists legion {id} it does not own", faction.id),
                ));
            }
        }
    }

    for territory in world.territories.values() {
        if let Some(owner) = &territory.owner {
            let listed = world
                .factions
                .get(owner)
                .is_some_and(|f| f.territory_ids.contains(&territory.id));
            if !listed {
                return Err(violation(
                    "territory_ownership",
                    format!("territory {} is not listed by its owner {owner}", territory.id),
                ));
            }
        }
    }
    for samurai in world.samurai.values() {
        if let Some(faction_id) = &samurai.faction_id {
            let listed = world
                .factions
                .get(faction_id)
                .is_some_and(|f| f.samurai_ids.contains(&samurai.id));
            if !listed {
                return Err(violation(
                    "samurai_membership",
                    format!("samurai {} is not listed by faction {faction_id}", samurai.id),
                ));
            }
        }
    }
    Ok(())
}

fn check_territories(world: &World) -> Result<(), InvariantViolation> {
    for territory in world.territories.values() {
        if territory.special_products.len() > MAX_SPECIAL_PRODUCTS {
            return Err(violation(
                "special_product_slots",
                format!(
                    "territory {} has {} special products",
                    territory.id,
                    territory.special_products.len()
                ),
            ));
        }
        if !CASTLE_LEVELS.contains(&territory.castle_level) {
            return Err(violation(
                "castle_level",
                format!(
                    "territory {} has castle level {}",
                    territory.id, territory.castle_level
                ),
            ));
        }
        if let Some(garrison) = &territory.garrison {
            if !world.legions.contains_key(garrison) {
                return Err(violation(
                    "garrison_ref",
                    format!("territory {} is garrisoned by missing legion {garrison}", territory.id),
                ));
            }
        }
    }
    Ok(())
}

fn check_legions(world: &World) -> Result<(), InvariantViolation> {
    for legion in world.legions.values() {
        let listed = world
            .factions
            .get(&legion.faction_id)
            .is_some_and(|f| f.legion_ids.contains(&legion.id));
        if !listed {
            return Err(violation(
                "legion_membership",
                format!("legion {} is not listed by faction {}", legion.id, legion.faction_id),
            ));
        }
        if legion.soldiers == 0 {
            return Err(violation(
                "legion_strength",
                format!("legion {} has no soldiers", legion.id),
            ));
        }
        if !world.territories.contains_key(&legion.location_id) {
            return Err(violation(
                "legion_location",
                format!("legion {} stands on missing territory {}", legion.id, legion.location_id),
            ));
        }
    }
    Ok(())
}

/// Commander assignment is injective and mirrored on the samurai.
fn check_commanders(world: &World) -> Result<(), InvariantViolation> {
    let mut seen: BTreeSet<&SamuraiId> = BTreeSet::new();
    for legion in world.legions.values() {
        if !seen.insert(&legion.commander_id) {
            return Err(violation(
                "commander_unique",
                format!("samurai {} commands more than one legion", legion.commander_id),
            ));
        }
        let Some(commander) = world.samurai.get(&legion.commander_id) else {
            return Err(violation(
                "commander_ref",
                format!("legion {} has missing commander {}", legion.id, legion.commander_id),
            ));
        };
        if commander.faction_id.as_ref() != Some(&legion.faction_id) {
            return Err(violation(
                "commander_faction",
                format!("commander {} serves another faction than legion {}", commander.id, legion.id),
            ));
        }
        if commander.current_legion_id.as_ref() != Some(&legion.id) || commander.is_idle {
            return Err(violation(
                "commander_link",
                format!("commander {} is not marked as leading legion {}", commander.id, legion.id),
            ));
        }
    }
    Ok(())
}

fn check_samurai(world: &World, max_action_points: u8) -> Result<(), InvariantViolation> {
    for samurai in world.samurai.values() {
        if samurai.action_points > max_action_points {
            return Err(violation(
                "action_points",
                format!(
                    "samurai {} has {} action points (max {max_action_points})",
                    samurai.id, samurai.action_points
                ),
            ));
        }
        if let Some(legion_id) = &samurai.current_legion_id {
            let leads = world
                .legions
                .get(legion_id)
                .is_some_and(|l| l.commander_id == samurai.id);
            if !leads {
                return Err(violation(
                    "commander_link",
                    format!("samurai {} points at legion {legion_id} it does not lead", samurai.id),
                ));
            }
        } else if !samurai.is_idle {
            return Err(violation(
                "commander_link",
                format!("samurai {} is busy without a legion", samurai.id),
            ));
        }
    }
    Ok(())
}

fn check_investment_bounds(world: &World) -> Result<(), InvariantViolation> {
    for faction in world.factions.values() {
        let p = faction.investment;
        let highest = p.agriculture.max(p.commerce).max(p.navy).max(p.armament);
        if highest > MAX_INVESTMENT_POINTS {
            return Err(violation(
                "investment_bounds",
                format!("faction {} has an investment counter at {highest}", faction.id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Equipment, LegionId};
    use crate::state::WorldBuilder;

    fn world() -> World {
        WorldBuilder::new()
            .faction_with_inventory("oda", "Oda", 100, 50, Equipment::new(1, 2, 3))
            .territory("kiyosu", "Owari", 100_000, Some("oda"))
            .samurai("nobunaga", "Oda Nobunaga", Some("oda"), 90, 80)
            .samurai("katsuie", "Shibata Katsuie", Some("oda"), 88, 50)
            .legion("l1", "赤備", "nobunaga", 100, Equipment::new(5, 0, 0), "kiyosu")
            .build()
    }

    #[test]
    fn valid_world_passes() {
        try_validate_invariants(&world(), 2).unwrap();
    }

    #[test]
    fn shared_commander_is_caught() {
        let mut w = world();
        let mut twin = w.legions[&LegionId::new("l1")].clone();
        twin.id = LegionId::new("l2");
        w.legions.insert(twin.id.clone(), twin);
        w.factions
            .get_mut(&FactionId::new("oda"))
            .unwrap()
            .legion_ids
            .push(LegionId::new("l2"));
        let err = try_validate_invariants(&w, 2).unwrap_err();
        assert_eq!(err.rule, "commander_unique");
    }

    #[test]
    fn busy_samurai_without_legion_is_caught() {
        let mut w = world();
        w.samurai.get_mut(&SamuraiId::new("katsuie")).unwrap().is_idle = false;
        assert_eq!(
            try_validate_invariants(&w, 2).unwrap_err().rule,
            "commander_link"
        );
    }

    #[test]
    fn action_points_bounded_by_rules() {
        let mut w = world();
        w.samurai
            .get_mut(&SamuraiId::new("katsuie"))
            .unwrap()
            .action_points = 3;
        assert_eq!(try_validate_invariants(&w, 2).unwrap_err().rule, "action_points");
        try_validate_invariants(&w, 3).unwrap();
    }

    #[test]
    fn unlisted_territory_is_caught() {
        let mut w = world();
        w.factions
            .get_mut(&FactionId::new("oda"))
            .unwrap()
            .territory_ids
            .clear();
        assert_eq!(
            try_validate_invariants(&w, 2).unwrap_err().rule,
            "territory_ownership"
        );
    }

    #[test]
    fn totals_include_legions() {
        let totals = ResourceTotals::of_world(&world());
        let oda = totals[&FactionId::new("oda")];
        assert_eq!(oda.soldiers, 150);
        assert_eq!(oda.rifles, 6);
        assert_eq!(oda.treasury, 100);
    }

    #[test]
    fn conservation_detects_leaks() {
        let before = world();
        let mut after = before.clone();
        after
            .legions
            .get_mut(&LegionId::new("l1"))
            .unwrap()
            .soldiers += 1;
        assert_eq!(
            check_conservation(&before, &after).unwrap_err().rule,
            "resource_conservation"
        );
        check_conservation(&before, &before).unwrap();
    }
}
