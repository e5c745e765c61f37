//! Investment resolver.
//!
//! A samurai spends one action point and a treasury cost to push one of the
//! faction's four investment counters. The roll is a d100 drawn from an
//! injected `DiceRoller`; everything else is exact integer arithmetic on
//! the samurai's relevant attribute.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::arithmetic::positive;
use crate::bands::InvestmentTrack;
use crate::commands::Invest;
use crate::config::GameRules;
use crate::domain::{FactionId, Samurai, SamuraiId, World, MAX_INVESTMENT_POINTS};
use crate::error::{EntityKind, LedgerError, Resource};

/// Attribute value at which the odds are even and the modifier is 1.
const ATTRIBUTE_PIVOT: i64 = 70;
const MIN_SUCCESS_PERCENT: i64 = 5;
const MAX_SUCCESS_PERCENT: i64 = 95;
/// Rolls strictly below this are critical successes.
const CRITICAL_BELOW: u32 = 5;

// ---------------------------------------------------------------------------
// Dice
// ---------------------------------------------------------------------------

/// Source of d100 rolls.
pub trait DiceRoller {
    /// A value in `1..=100`.
    fn roll_d100(&mut self) -> u32;
}

/// Dice backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomDice<R = SmallRng> {
    rng: R,
}

impl RandomDice<SmallRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Reproducible sequence of rolls.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> DiceRoller for RandomDice<R> {
    fn roll_d100(&mut self) -> u32 {
        self.rng.gen_range(1..=100)
    }
}

/// Always rolls the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRoll(pub u32);

impl DiceRoller for FixedRoll {
    fn roll_d100(&mut self) -> u32 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Odds and yield
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Critical,
    Success,
    Failure,
}

/// Success chance in whole percent: `clamp(5, 95, 50 + attribute - 70)`.
pub fn success_percent(attribute: i32) -> u32 {
    let pct = (50 + i64::from(attribute) - ATTRIBUTE_PIVOT)
        .clamp(MIN_SUCCESS_PERCENT, MAX_SUCCESS_PERCENT);
    pct as u32
}

pub fn success_rate(attribute: i32) -> f64 {
    f64::from(success_percent(attribute)) / 100.0
}

/// Yield multiplier in whole percent, unclamped: `100 + attribute - 70`.
pub fn modifier_percent(attribute: i32) -> i64 {
    100 + i64::from(attribute) - ATTRIBUTE_PIVOT
}

pub fn modifier_coefficient(attribute: i32) -> f64 {
    modifier_percent(attribute) as f64 / 100.0
}

/// Partition `1..=100`: below 5 critical, up to the success percent a
/// success, anything higher a failure.
pub fn determine_outcome(roll: u32, success_percent: u32) -> Outcome {
    if roll < CRITICAL_BELOW {
        Outcome::Critical
    } else if roll <= success_percent {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

/// Points earned for an outcome; never negative.
pub fn points_for(outcome: Outcome, base_points: u64, attribute: i32) -> u64 {
    let multiplier: i128 = match outcome {
        Outcome::Critical => 2,
        Outcome::Success => 1,
        Outcome::Failure => return 0,
    };
    let scaled = i128::from(base_points) * multiplier * i128::from(modifier_percent(attribute));
    let floored = scaled.div_euclid(100).max(0);
    u64::try_from(floored).unwrap_or(u64::MAX)
}

/// Civil tracks read the civil attribute, martial tracks the martial one.
pub fn track_attribute(track: InvestmentTrack, samurai: &Samurai) -> i32 {
    match track {
        InvestmentTrack::Agriculture | InvestmentTrack::Commerce => samurai.civil,
        InvestmentTrack::Navy | InvestmentTrack::Armament => samurai.martial,
    }
}

/// `(cost, base_points)` for one investment.
pub fn track_cost(
    rules: &GameRules,
    track: InvestmentTrack,
    amount: Option<i64>,
) -> Result<(u64, u64), LedgerError> {
    let rule = match track {
        InvestmentTrack::Agriculture => rules.investment.agriculture,
        InvestmentTrack::Navy => rules.investment.navy,
        InvestmentTrack::Armament => rules.investment.armament,
        InvestmentTrack::Commerce => {
            let amount = amount
                .ok_or_else(|| LedgerError::validation("amount", "commerce needs an amount"))?;
            let amount = positive("amount", amount)?;
            let divisor = rules.investment.commerce_divisor.max(1);
            return Ok((amount, amount / divisor));
        }
    };
    Ok((rule.cost, rule.base_points))
}

// ---------------------------------------------------------------------------
// Preview and execution
// ---------------------------------------------------------------------------

/// Every figure of an investment short of the roll itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentQuote {
    pub faction_id: FactionId,
    pub samurai_id: SamuraiId,
    pub track: InvestmentTrack,
    pub attribute: i32,
    pub cost: u64,
    pub base_points: u64,
    pub success_rate: f64,
    pub modifier_coefficient: f64,
    /// Points on a plain success.
    pub success_points: u64,
    pub critical_points: u64,
    pub current_points: u32,
    pub current_level: &'static str,
    pub action_points: u8,
    pub treasury: u64,
    pub usable: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentReport {
    pub samurai_id: SamuraiId,
    pub track: InvestmentTrack,
    pub roll: u32,
    pub outcome: Outcome,
    pub cost: u64,
    pub points_earned: u64,
    pub points_before: u32,
    pub points_after: u32,
    pub level: &'static str,
    pub remaining_action_points: u8,
    pub treasury_after: u64,
}

fn lookup<'a>(
    world: &'a World,
    faction_id: &FactionId,
    samurai_id: &SamuraiId,
) -> Result<&'a Samurai, LedgerError> {
    if !world.factions.contains_key(faction_id) {
        return Err(LedgerError::not_found(EntityKind::Faction, faction_id));
    }
    let samurai = world
        .samurai
        .get(samurai_id)
        .ok_or_else(|| LedgerError::not_found(EntityKind::Samurai, samurai_id))?;
    if samurai.faction_id.as_ref() != Some(faction_id) {
        return Err(LedgerError::NotOwned {
            entity: EntityKind::Samurai,
            id: samurai_id.to_string(),
            faction_id: faction_id.to_string(),
        });
    }
    Ok(samurai)
}

/// Whether the samurai and faction can pay for this investment right now.
fn check_affordable(samurai: &Samurai, treasury: u64, cost: u64) -> Result<(), LedgerError> {
    if samurai.action_points == 0 {
        return Err(LedgerError::insufficient(Resource::ActionPoints, 1, 0));
    }
    if treasury < cost {
        return Err(LedgerError::insufficient(Resource::Treasury, cost, treasury));
    }
    Ok(())
}

/// Quote an investment without rolling or committing.
///
/// Missing or foreign entities are errors; a samurai out of action points
/// or a short treasury comes back as `usable: false` with the reason.
pub fn preview(
    world: &World,
    rules: &GameRules,
    faction_id: &FactionId,
    request: &Invest,
) -> Result<InvestmentQuote, LedgerError> {
    let samurai = lookup(world, faction_id, &request.samurai_id)?;
    let faction = &world.factions[faction_id];
    let (cost, base_points) = track_cost(rules, request.track, request.amount)?;
    let attribute = track_attribute(request.track, samurai);
    let current_points = faction.investment.get(request.track);
    let reason = check_affordable(samurai, faction.treasury, cost)
        .err()
        .map(|e| e.to_string());

    Ok(InvestmentQuote {
        faction_id: faction_id.clone(),
        samurai_id: samurai.id.clone(),
        track: request.track,
        attribute,
        cost,
        base_points,
        success_rate: success_rate(attribute),
        modifier_coefficient: modifier_coefficient(attribute),
        success_points: points_for(Outcome::Success, base_points, attribute),
        critical_points: points_for(Outcome::Critical, base_points, attribute),
        current_points,
        current_level: request.track.level_name(current_points),
        action_points: samurai.action_points,
        treasury: faction.treasury,
        usable: reason.is_none(),
        reason,
    })
}

/// Roll and commit. Every outcome, failure included, charges the cost and
/// one action point.
pub fn execute(
    world: &mut World,
    rules: &GameRules,
    faction_id: &FactionId,
    request: &Invest,
    dice: &mut dyn DiceRoller,
) -> Result<InvestmentReport, LedgerError> {
    let samurai = lookup(world, faction_id, &request.samurai_id)?;
    let (cost, base_points) = track_cost(rules, request.track, request.amount)?;
    check_affordable(samurai, world.factions[faction_id].treasury, cost)?;
    let attribute = track_attribute(request.track, samurai);

    let roll = dice.roll_d100();
    let outcome = determine_outcome(roll, success_percent(attribute));
    let earned = points_for(outcome, base_points, attribute);

    let Some(samurai) = world.samurai.get_mut(&request.samurai_id) else {
        return Err(LedgerError::not_found(EntityKind::Samurai, &request.samurai_id));
    };
    samurai.action_points -= 1;
    let remaining_action_points = samurai.action_points;

    let Some(faction) = world.factions.get_mut(faction_id) else {
        return Err(LedgerError::not_found(EntityKind::Faction, faction_id));
    };
    faction.treasury -= cost;
    let counter = faction.investment.get_mut(request.track);
    let points_before = *counter;
    let gained = u32::try_from(earned).unwrap_or(u32::MAX);
    *counter = points_before.saturating_add(gained).min(MAX_INVESTMENT_POINTS);
    let points_after = *counter;

    Ok(InvestmentReport {
        samurai_id: request.samurai_id.clone(),
        track: request.track,
        roll,
        outcome,
        cost,
        points_earned: earned,
        points_before,
        points_after,
        level: request.track.level_name(points_after),
        remaining_action_points,
        treasury_after: faction.treasury,
    })
}
