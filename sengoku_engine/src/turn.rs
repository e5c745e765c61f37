//! Year advancement.
//!
//! Every faction's figures are computed from the world as it stood before
//! the advance, then applied together: territory growth, income less
//! maintenance, horse output, buff expiry, action point reset and the tax
//! gate reset.

use serde::Serialize;

use crate::arithmetic::apply_percent_floor;
use crate::config::GameRules;
use crate::domain::{FactionId, World};
use crate::economy::{faction_report, EconomicReport};
use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionYearSummary {
    pub faction_id: FactionId,
    pub income: u64,
    pub maintenance: u64,
    pub treasury_before: u64,
    pub treasury_after: u64,
    pub growth_rate: f64,
    pub territory_kokudaka_before: u64,
    pub territory_kokudaka_after: u64,
    pub horses_produced: u64,
    pub expired_buffs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearReport {
    pub from_year: u32,
    pub to_year: u32,
    pub factions: Vec<FactionYearSummary>,
}

/// `max(0, treasury + floor(income) - ceil(maintenance))`.
fn settle_treasury(treasury: u64, report: &EconomicReport) -> (u64, u64, u64) {
    let income = report.income.max(0.0).floor() as u64;
    let maintenance = report.maintenance.total.max(0.0).ceil() as u64;
    let after = treasury.saturating_add(income).saturating_sub(maintenance);
    (income, maintenance, after)
}

pub fn advance_year(world: &mut World, rules: &GameRules) -> Result<YearReport, LedgerError> {
    let from_year = world.current_year();
    let to_year = from_year + 1;

    let reports = world
        .factions
        .keys()
        .map(|id| faction_report(world, id))
        .collect::<Result<Vec<_>, _>>()?;

    let mut factions = Vec::with_capacity(reports.len());
    for report in &reports {
        let id = &report.faction_id;

        let mut kokudaka_after = 0;
        for territory in world.territories.values_mut() {
            if territory.owner.as_ref() == Some(id) {
                territory.kokudaka = apply_percent_floor(territory.kokudaka, report.growth_pct);
                kokudaka_after += territory.kokudaka;
            }
        }

        let Some(faction) = world.factions.get_mut(id) else {
            continue;
        };
        let treasury_before = faction.treasury;
        let (income, maintenance, treasury_after) = settle_treasury(treasury_before, report);
        faction.treasury = treasury_after;
        faction.equipment.horses += report.special_product_horse_output;
        faction.tax_changed_year = None;

        let (expired, kept) = faction
            .buffs
            .drain(..)
            .partition(|b| b.expires_year <= to_year);
        faction.buffs = kept;
        let expired_buffs = expired.into_iter().map(|b| b.name).collect();

        factions.push(FactionYearSummary {
            faction_id: id.clone(),
            income,
            maintenance,
            treasury_before,
            treasury_after,
            growth_rate: report.growth_rate,
            territory_kokudaka_before: report.territory_kokudaka,
            territory_kokudaka_after: kokudaka_after,
            horses_produced: report.special_product_horse_output,
            expired_buffs,
        });
    }

    for samurai in world.samurai.values_mut() {
        samurai.action_points = rules.max_action_points;
    }
    world.game_state.current_year = to_year;

    Ok(YearReport {
        from_year,
        to_year,
        factions,
    })
}
