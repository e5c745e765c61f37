//! Economic calculator.
//!
//! Pure derivations from a faction's entities to the figures shown on its
//! status page. No side effects, no storage access.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::arithmetic::{apply_percent, mul_div_floor};
use crate::bands::{
    armament_level, integration_bonus_for, maintenance_band, ArmamentLevel, InvestmentTrack,
};
use crate::domain::{
    Equipment, Faction, FactionId, Legion, SpecialProduct, TaxRate, Territory, TerritoryId,
    World,
};
use crate::error::{EntityKind, LedgerError};

/// Kokudaka that raises the recruit cap by `multiplier` soldiers.
pub const KOKUDAKA_PER_RECRUIT_UNIT: u64 = 10_000;
/// Salary paid per samurai each year, outside the armament modifier.
pub const SAMURAI_SALARY: u64 = 2000;

const INFANTRY_UPKEEP: u64 = 4;
const HORSE_UPKEEP: u64 = 12;
const RIFLE_UPKEEP: u64 = 3;
const CANNON_UPKEEP: u64 = 8;
const LEGION_SOLDIER_UPKEEP: u64 = 4;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything the calculator reads for one faction.
///
/// `territories` is the whole map: province control compares the faction's
/// holdings against every territory in the province.
#[derive(Debug, Clone)]
pub struct EconomyInputs<'a> {
    pub faction: &'a Faction,
    pub territories: &'a BTreeMap<TerritoryId, Territory>,
    pub legions: Vec<&'a Legion>,
    pub samurai_count: u64,
    pub catalog: &'a BTreeMap<String, SpecialProduct>,
}

impl<'a> EconomyInputs<'a> {
    pub fn from_world(world: &'a World, faction_id: &FactionId) -> Result<Self, LedgerError> {
        let faction = world
            .factions
            .get(faction_id)
            .ok_or_else(|| LedgerError::not_found(EntityKind::Faction, faction_id))?;
        Ok(Self {
            faction,
            territories: &world.territories,
            legions: world.legions_of(&faction.id).collect(),
            samurai_count: world.samurai_of(&faction.id).count() as u64,
            catalog: &world.special_products,
        })
    }

    fn owned_territories(&self) -> impl Iterator<Item = &'a Territory> + '_ {
        let id = &self.faction.id;
        self.territories
            .values()
            .filter(move |t| t.owner.as_ref() == Some(id))
    }

    fn legion_soldiers(&self) -> u64 {
        self.legions.iter().map(|l| l.soldiers).sum()
    }

    fn legion_equipment(&self) -> Equipment {
        self.legions
            .iter()
            .fold(Equipment::default(), |acc, l| acc.saturating_add(l.equipment))
    }
}

// ---------------------------------------------------------------------------
// Individual derivations
// ---------------------------------------------------------------------------

pub fn territory_kokudaka(inputs: &EconomyInputs<'_>) -> u64 {
    inputs.owned_territories().map(|t| t.kokudaka).sum()
}

/// Catalog yield and soldier bonus summed over every product slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialProductTotals {
    pub kokudaka: u64,
    pub soldier_bonus: u64,
    pub horse_output: u64,
}

pub fn special_product_totals(inputs: &EconomyInputs<'_>) -> SpecialProductTotals {
    let mut totals = SpecialProductTotals::default();
    for territory in inputs.owned_territories() {
        for name in &territory.special_products {
            if let Some(product) = inputs.catalog.get(name) {
                totals.kokudaka += product.kokudaka;
                totals.soldier_bonus += product.soldier_bonus;
                totals.horse_output += product.horse_output;
            }
        }
    }
    totals
}

/// Per-province holding: `(owned, total, province kokudaka)`.
fn province_holdings<'a>(inputs: &EconomyInputs<'a>) -> BTreeMap<&'a str, (usize, usize, u64)> {
    let mut provinces: BTreeMap<&'a str, (usize, usize, u64)> = BTreeMap::new();
    for territory in inputs.territories.values() {
        let entry = provinces.entry(territory.province.as_str()).or_default();
        entry.1 += 1;
        entry.2 += territory.kokudaka;
        if territory.owner.as_ref() == Some(&inputs.faction.id) {
            entry.0 += 1;
        }
    }
    provinces
}

/// Provinces in which the faction owns every territory.
pub fn controlled_provinces(inputs: &EconomyInputs<'_>) -> Vec<String> {
    province_holdings(inputs)
        .into_iter()
        .filter(|(_, (owned, total, _))| *owned > 0 && owned == total)
        .map(|(name, _)| name.to_string())
        .collect()
}

pub fn integration_bonus(inputs: &EconomyInputs<'_>) -> u64 {
    province_holdings(inputs)
        .into_values()
        .filter(|(owned, total, _)| *owned > 0 && owned == total)
        .map(|(_, _, kokudaka)| integration_bonus_for(kokudaka))
        .sum()
}

pub fn total_soldiers(inputs: &EconomyInputs<'_>) -> u64 {
    inputs.faction.idle_soldiers + inputs.legion_soldiers()
}

/// `floor(territory_kokudaka / 10000 * multiplier) + soldier_bonus`.
pub fn max_recruitable_soldiers(
    territory_kokudaka: u64,
    tax_rate: TaxRate,
    special_product_soldier_bonus: u64,
) -> u64 {
    mul_div_floor(
        territory_kokudaka,
        tax_rate.recruit_multiplier(),
        KOKUDAKA_PER_RECRUIT_UNIT,
    ) + special_product_soldier_bonus
}

/// Soldiers over recruit cap; may exceed 1.
pub fn soldier_maintenance_ratio(total_soldiers: u64, max_recruitable: u64) -> f64 {
    match (total_soldiers, max_recruitable) {
        (0, _) => 0.0,
        (_, 0) => 1.0,
        (total, cap) => total as f64 / cap as f64,
    }
}

/// `territory * (1 + bonus) + products + integration + industry`.
pub fn surface_kokudaka(
    territory_kokudaka: u64,
    bonus_pct: i64,
    special_product_kokudaka: u64,
    integration_bonus: u64,
    industry_kokudaka: u64,
) -> f64 {
    apply_percent(territory_kokudaka, bonus_pct)
        + (special_product_kokudaka + integration_bonus + industry_kokudaka) as f64
}

/// `surface * tax_rate * 0.4`.
pub fn income(surface_kokudaka: f64, tax_rate: TaxRate) -> f64 {
    surface_kokudaka * (tax_rate.tenths() * 4) as f64 / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceCost {
    pub infantry: u64,
    pub horse: u64,
    pub rifle: u64,
    pub cannon: u64,
    pub legion_extra: u64,
    pub samurai_salary: u64,
    pub military_subtotal: u64,
    pub armament_modifier: f64,
    pub total: f64,
}

/// Yearly upkeep. Equipment and soldier totals include legion holdings.
pub fn maintenance_cost(
    total_soldiers: u64,
    total_equipment: Equipment,
    legion_soldiers: u64,
    samurai_count: u64,
    armament: &ArmamentLevel,
) -> MaintenanceCost {
    let infantry = total_soldiers * INFANTRY_UPKEEP;
    let horse = total_equipment.horses * HORSE_UPKEEP;
    let rifle = total_equipment.rifles * RIFLE_UPKEEP;
    let cannon = total_equipment.cannons * CANNON_UPKEEP;
    let legion_extra = legion_soldiers * LEGION_SOLDIER_UPKEEP;
    let samurai_salary = samurai_count * SAMURAI_SALARY;
    let military_subtotal = infantry + horse + rifle + cannon + legion_extra;
    let total =
        apply_percent(military_subtotal, armament.maintenance_modifier_pct) + samurai_salary as f64;

    MaintenanceCost {
        infantry,
        horse,
        rifle,
        cannon,
        legion_extra,
        samurai_salary,
        military_subtotal,
        armament_modifier: armament.maintenance_modifier(),
        total,
    }
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentStatus {
    pub track: InvestmentTrack,
    pub points: u32,
    pub level: &'static str,
}

/// Every displayed economic figure for one faction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicReport {
    pub faction_id: FactionId,
    pub territory_kokudaka: u64,
    pub special_product_kokudaka: u64,
    pub special_product_soldier_bonus: u64,
    pub special_product_horse_output: u64,
    pub integration_bonus: u64,
    pub controlled_provinces: Vec<String>,
    pub industry_kokudaka: u64,
    pub total_soldiers: u64,
    pub legion_soldiers: u64,
    pub max_recruitable_soldiers: u64,
    pub soldier_maintenance_ratio: f64,
    pub bonus_coefficient: f64,
    pub growth_rate: f64,
    /// Integer form of `growth_rate`, used when applying growth.
    #[serde(skip)]
    pub growth_pct: i64,
    pub surface_kokudaka: f64,
    pub income: f64,
    pub armament_level: ArmamentLevel,
    pub maintenance: MaintenanceCost,
    pub investments: Vec<InvestmentStatus>,
}

pub fn compute_report(inputs: &EconomyInputs<'_>) -> EconomicReport {
    let faction = inputs.faction;
    let territory = territory_kokudaka(inputs);
    let products = special_product_totals(inputs);
    let integration = integration_bonus(inputs);
    let legion_soldiers = inputs.legion_soldiers();
    let soldiers = faction.idle_soldiers + legion_soldiers;
    let cap = max_recruitable_soldiers(territory, faction.tax_rate, products.soldier_bonus);
    let ratio = soldier_maintenance_ratio(soldiers, cap);
    let band = maintenance_band(ratio);
    let surface = surface_kokudaka(
        territory,
        band.bonus_pct,
        products.kokudaka,
        integration,
        faction.industry_kokudaka,
    );
    let armament = armament_level(faction.investment.armament);
    let equipment = faction.equipment.saturating_add(inputs.legion_equipment());
    let maintenance = maintenance_cost(
        soldiers,
        equipment,
        legion_soldiers,
        inputs.samurai_count,
        &armament,
    );

    let investments = InvestmentTrack::ALL
        .into_iter()
        .map(|track| {
            let points = faction.investment.get(track);
            InvestmentStatus {
                track,
                points,
                level: track.level_name(points),
            }
        })
        .collect();

    EconomicReport {
        faction_id: faction.id.clone(),
        territory_kokudaka: territory,
        special_product_kokudaka: products.kokudaka,
        special_product_soldier_bonus: products.soldier_bonus,
        special_product_horse_output: products.horse_output,
        integration_bonus: integration,
        controlled_provinces: controlled_provinces(inputs),
        industry_kokudaka: faction.industry_kokudaka,
        total_soldiers: soldiers,
        legion_soldiers,
        max_recruitable_soldiers: cap,
        soldier_maintenance_ratio: ratio,
        bonus_coefficient: band.bonus_pct as f64 / 100.0,
        growth_rate: band.growth_pct as f64 / 100.0,
        growth_pct: band.growth_pct,
        surface_kokudaka: surface,
        income: income(surface, faction.tax_rate),
        armament_level: armament,
        maintenance,
        investments,
    }
}

/// Convenience wrapper over `compute_report` for one faction of a world.
pub fn faction_report(world: &World, faction_id: &FactionId) -> Result<EconomicReport, LedgerError> {
    let inputs = EconomyInputs::from_world(world, faction_id)?;
    Ok(compute_report(&inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorldBuilder;

    fn two_territory_province(owner_b: Option<&str>) -> World {
        WorldBuilder::new()
            .faction("oda", "Oda")
            .faction("imagawa", "Imagawa")
            .territory("kiyosu", "Owari", 200_000, Some("oda"))
            .territory("nagoya", "Owari", 150_000, owner_b)
            .build()
    }

    #[test]
    fn recruit_cap_scenario() {
        assert_eq!(max_recruitable_soldiers(100_000, TaxRate::Low, 0), 2300);
        assert_eq!(max_recruitable_soldiers(100_000, TaxRate::Low, 150), 2450);
        assert_eq!(max_recruitable_soldiers(100_000, TaxRate::Standard, 0), 2000);
        assert_eq!(max_recruitable_soldiers(100_000, TaxRate::High, 0), 1800);
        assert_eq!(max_recruitable_soldiers(15_000, TaxRate::High, 0), 270);
    }

    #[test]
    fn full_province_earns_integration_bonus() {
        let world = two_territory_province(Some("oda"));
        let report = faction_report(&world, &"oda".into()).unwrap();
        assert_eq!(report.territory_kokudaka, 350_000);
        assert_eq!(report.integration_bonus, 20_000);
        assert_eq!(report.controlled_provinces, vec!["Owari".to_string()]);
    }

    #[test]
    fn partial_province_earns_nothing() {
        let world = two_territory_province(Some("imagawa"));
        let report = faction_report(&world, &"oda".into()).unwrap();
        assert_eq!(report.integration_bonus, 0);
        assert!(report.controlled_provinces.is_empty());

        let unowned = two_territory_province(None);
        let report = faction_report(&unowned, &"oda".into()).unwrap();
        assert_eq!(report.integration_bonus, 0);
    }

    #[test]
    fn ratio_edges() {
        assert_eq!(soldier_maintenance_ratio(0, 0), 0.0);
        assert_eq!(soldier_maintenance_ratio(10, 0), 1.0);
        assert_eq!(soldier_maintenance_ratio(0, 100), 0.0);
        assert_eq!(soldier_maintenance_ratio(150, 100), 1.5);
    }

    #[test]
    fn special_products_are_summed_per_slot() {
        let world = WorldBuilder::new()
            .faction("oda", "Oda")
            .special_product("salt", 5_000, 0, 50)
            .special_product("horses", 0, 30, 0)
            .territory_with_products("tsushima", "Owari", 80_000, Some("oda"), &["salt", "horses"])
            .territory_with_products("atsuta", "Owari", 40_000, Some("oda"), &["salt", "unknown"])
            .build();
        let inputs = EconomyInputs::from_world(&world, &"oda".into()).unwrap();
        let totals = special_product_totals(&inputs);
        assert_eq!(totals.kokudaka, 10_000);
        assert_eq!(totals.soldier_bonus, 100);
        assert_eq!(totals.horse_output, 30);
    }

    #[test]
    fn surface_and_income() {
        // ratio 0 -> +12%
        let surface = surface_kokudaka(100_000, 12, 5_000, 10_000, 1_000);
        assert_eq!(surface, 128_000.0);
        assert_eq!(income(surface, TaxRate::Low), 20_480.0);
        assert_eq!(income(100_000.0, TaxRate::High), 32_000.0);
    }

    #[test]
    fn maintenance_formula() {
        let cost = maintenance_cost(
            1000,
            Equipment::new(100, 50, 2),
            600,
            3,
            &armament_level(0),
        );
        assert_eq!(cost.infantry, 4000);
        assert_eq!(cost.horse, 600);
        assert_eq!(cost.rifle, 300);
        assert_eq!(cost.cannon, 16);
        assert_eq!(cost.legion_extra, 2400);
        assert_eq!(cost.military_subtotal, 7316);
        assert_eq!(cost.samurai_salary, 6000);
        // 7316 * 1.2 + 6000
        assert_eq!(cost.total, 14_779.2);
    }

    #[test]
    fn report_counts_legion_holdings() {
        let world = WorldBuilder::new()
            .faction_with_inventory("oda", "Oda", 1000, 500, Equipment::new(100, 20, 1))
            .territory("kiyosu", "Owari", 100_000, Some("oda"))
            .samurai("nobunaga", "Oda Nobunaga", Some("oda"), 90, 80)
            .legion("l1", "赤備", "nobunaga", 300, Equipment::new(50, 10, 1), "kiyosu")
            .build();
        let report = faction_report(&world, &"oda".into()).unwrap();
        assert_eq!(report.total_soldiers, 800);
        assert_eq!(report.legion_soldiers, 300);
        // default tax 0.6 -> 2000 cap; 800 / 2000 = 0.40 -> +6%
        assert_eq!(report.max_recruitable_soldiers, 2000);
        assert_eq!(report.bonus_coefficient, 0.06);
        assert_eq!(report.surface_kokudaka, 106_000.0);
        assert_eq!(report.maintenance.rifle, 150 * 3);
        assert_eq!(report.maintenance.horse, 30 * 12);
        assert_eq!(report.maintenance.cannon, 2 * 8);
        assert_eq!(report.maintenance.samurai_salary, 2000);
    }

    #[test]
    fn unknown_faction_is_not_found() {
        let world = WorldBuilder::new().build();
        let err = faction_report(&world, &"ghost".into()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
