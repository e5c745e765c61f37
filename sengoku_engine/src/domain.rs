//! Core domain types.
//!
//! Pure data. Mutation lives in `ledger`, `investment`, `turn` and
//! `transitions`; derivation lives in `economy`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bands::InvestmentTrack;

// ── Identifiers ────────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(FactionId);
string_id!(TerritoryId);
string_id!(SamuraiId);
string_id!(LegionId);

// ── Tax rate ───────────────────────────────────────────────────────

/// The three legal tax rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum TaxRate {
    Low,
    Standard,
    High,
}

impl TaxRate {
    pub const ALL: [TaxRate; 3] = [TaxRate::Low, TaxRate::Standard, TaxRate::High];

    pub fn as_f64(self) -> f64 {
        match self {
            TaxRate::Low => 0.4,
            TaxRate::Standard => 0.6,
            TaxRate::High => 0.8,
        }
    }

    /// Tenths, for exact integer arithmetic (`0.4` -> 4).
    pub fn tenths(self) -> u64 {
        match self {
            TaxRate::Low => 4,
            TaxRate::Standard => 6,
            TaxRate::High => 8,
        }
    }

    /// Soldiers per 10,000 kokudaka.
    pub fn recruit_multiplier(self) -> u64 {
        recruit_multiplier_for(self.as_f64())
    }

    pub fn from_f64(rate: f64) -> Option<TaxRate> {
        TaxRate::ALL
            .into_iter()
            .find(|r| (r.as_f64() - rate).abs() < 1e-9)
    }
}

/// Multiplier lookup on a raw rate; anything unrecognised uses the 0.6 row.
pub fn recruit_multiplier_for(rate: f64) -> u64 {
    match TaxRate::ALL
        .into_iter()
        .find(|r| (r.as_f64() - rate).abs() < 1e-9)
    {
        Some(TaxRate::Low) => 230,
        Some(TaxRate::High) => 180,
        Some(TaxRate::Standard) | None => 200,
    }
}

impl From<TaxRate> for f64 {
    fn from(rate: TaxRate) -> f64 {
        rate.as_f64()
    }
}

impl TryFrom<f64> for TaxRate {
    type Error = String;

    fn try_from(rate: f64) -> Result<Self, Self::Error> {
        TaxRate::from_f64(rate).ok_or_else(|| format!("illegal tax rate {rate}"))
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::Standard
    }
}

// ── Equipment ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Rifles,
    Horses,
    Cannons,
}

impl EquipmentKind {
    pub const ALL: [EquipmentKind; 3] = [
        EquipmentKind::Rifles,
        EquipmentKind::Horses,
        EquipmentKind::Cannons,
    ];
}

/// Rifle / horse / cannon counts, used both for inventories and legions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Equipment {
    pub rifles: u64,
    pub horses: u64,
    pub cannons: u64,
}

impl Equipment {
    pub fn new(rifles: u64, horses: u64, cannons: u64) -> Self {
        Self {
            rifles,
            horses,
            cannons,
        }
    }

    pub fn get(&self, kind: EquipmentKind) -> u64 {
        match kind {
            EquipmentKind::Rifles => self.rifles,
            EquipmentKind::Horses => self.horses,
            EquipmentKind::Cannons => self.cannons,
        }
    }

    pub fn get_mut(&mut self, kind: EquipmentKind) -> &mut u64 {
        match kind {
            EquipmentKind::Rifles => &mut self.rifles,
            EquipmentKind::Horses => &mut self.horses,
            EquipmentKind::Cannons => &mut self.cannons,
        }
    }

    pub fn saturating_add(self, other: Equipment) -> Equipment {
        Equipment {
            rifles: self.rifles.saturating_add(other.rifles),
            horses: self.horses.saturating_add(other.horses),
            cannons: self.cannons.saturating_add(other.cannons),
        }
    }
}

// ── Investment points ──────────────────────────────────────────────

/// The four investment counters, each held in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvestmentPoints {
    pub agriculture: u32,
    pub commerce: u32,
    pub navy: u32,
    pub armament: u32,
}

pub const MAX_INVESTMENT_POINTS: u32 = 100;

impl InvestmentPoints {
    pub fn get(&self, track: InvestmentTrack) -> u32 {
        match track {
            InvestmentTrack::Agriculture => self.agriculture,
            InvestmentTrack::Commerce => self.commerce,
            InvestmentTrack::Navy => self.navy,
            InvestmentTrack::Armament => self.armament,
        }
    }

    pub fn get_mut(&mut self, track: InvestmentTrack) -> &mut u32 {
        match track {
            InvestmentTrack::Agriculture => &mut self.agriculture,
            InvestmentTrack::Commerce => &mut self.commerce,
            InvestmentTrack::Navy => &mut self.navy,
            InvestmentTrack::Armament => &mut self.armament,
        }
    }
}

// ── Entities ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Allied,
    Friendly,
    Neutral,
    Hostile,
    AtWar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiplomacyRelation {
    pub target_id: FactionId,
    pub stance: Stance,
}

/// A temporary effect on a faction, dropped once `expires_year` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActiveBuff {
    pub name: String,
    pub description: String,
    pub expires_year: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub leader_name: String,
    pub login_code: String,
    pub tax_rate: TaxRate,
    pub treasury: u64,
    pub idle_soldiers: u64,
    pub equipment: Equipment,
    pub investment: InvestmentPoints,
    pub industry_kokudaka: u64,
    pub territory_ids: Vec<TerritoryId>,
    pub samurai_ids: Vec<SamuraiId>,
    pub legion_ids: Vec<LegionId>,
    #[serde(default)]
    pub diplomacy: Vec<DiplomacyRelation>,
    #[serde(default)]
    pub buffs: Vec<ActiveBuff>,
    /// Year of the last tax change; cleared when the year advances.
    #[serde(default)]
    pub tax_changed_year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Territory {
    pub id: TerritoryId,
    pub province: String,
    pub district: String,
    pub castle_name: String,
    pub castle_level: u8,
    pub kokudaka: u64,
    #[serde(default)]
    pub special_products: Vec<String>,
    #[serde(default)]
    pub owner: Option<FactionId>,
    #[serde(default)]
    pub garrison: Option<LegionId>,
}

pub const MAX_SPECIAL_PRODUCTS: usize = 3;
pub const CASTLE_LEVELS: std::ops::RangeInclusive<u8> = 1..=7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Warrior,
    Strategist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Samurai {
    pub id: SamuraiId,
    pub name: String,
    pub archetype: Archetype,
    pub martial: i32,
    pub civil: i32,
    #[serde(default)]
    pub faction_id: Option<FactionId>,
    pub is_idle: bool,
    pub action_points: u8,
    #[serde(default)]
    pub current_legion_id: Option<LegionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Legion {
    pub id: LegionId,
    pub name: String,
    pub commander_id: SamuraiId,
    pub commander_name: String,
    pub soldiers: u64,
    pub equipment: Equipment,
    pub location_id: TerritoryId,
    pub location_name: String,
    pub faction_id: FactionId,
}

/// Catalog entry, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpecialProduct {
    pub name: String,
    pub kokudaka: u64,
    pub horse_output: u64,
    pub soldier_bonus: u64,
    pub kokudaka_bonus_pct: u32,
    #[serde(default)]
    pub other_effects: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GameState {
    pub current_year: u32,
    pub is_locked: bool,
    pub admin_code: String,
    /// Monotonic counter used to mint legion IDs.
    #[serde(default)]
    pub next_serial: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_year: 1,
            is_locked: false,
            admin_code: String::new(),
            next_serial: 1,
        }
    }
}

// ── World ──────────────────────────────────────────────────────────

/// Entities stored in a keyed collection.
pub trait Keyed {
    type Key: Ord;
    fn key(&self) -> Self::Key;
}

impl Keyed for Faction {
    type Key = FactionId;
    fn key(&self) -> FactionId {
        self.id.clone()
    }
}

impl Keyed for Territory {
    type Key = TerritoryId;
    fn key(&self) -> TerritoryId {
        self.id.clone()
    }
}

impl Keyed for Samurai {
    type Key = SamuraiId;
    fn key(&self) -> SamuraiId {
        self.id.clone()
    }
}

impl Keyed for Legion {
    type Key = LegionId;
    fn key(&self) -> LegionId {
        self.id.clone()
    }
}

impl Keyed for SpecialProduct {
    type Key = String;
    fn key(&self) -> String {
        self.name.clone()
    }
}

/// Every entity collection plus the game clock; the unit a snapshot copies.
///
/// Collections serialize as JSON arrays and are keyed in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct World {
    #[serde(with = "keyed_list")]
    pub factions: BTreeMap<FactionId, Faction>,
    #[serde(with = "keyed_list")]
    pub territories: BTreeMap<TerritoryId, Territory>,
    #[serde(with = "keyed_list")]
    pub samurai: BTreeMap<SamuraiId, Samurai>,
    #[serde(with = "keyed_list")]
    pub legions: BTreeMap<LegionId, Legion>,
    #[serde(with = "keyed_list")]
    pub special_products: BTreeMap<String, SpecialProduct>,
    pub game_state: GameState,
}

impl World {
    pub fn current_year(&self) -> u32 {
        self.game_state.current_year
    }

    pub fn legions_of<'a>(&'a self, faction_id: &'a FactionId) -> impl Iterator<Item = &'a Legion> {
        self.legions
            .values()
            .filter(move |l| &l.faction_id == faction_id)
    }

    pub fn samurai_of<'a>(&'a self, faction_id: &'a FactionId) -> impl Iterator<Item = &'a Samurai> {
        self.samurai
            .values()
            .filter(move |s| s.faction_id.as_ref() == Some(faction_id))
    }
}

/// Serde adapter: `BTreeMap<K, V>` <-> JSON array of `V`.
pub mod keyed_list {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Keyed;

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Keyed + Deserialize<'de>,
    {
        let items = Vec::<V>::deserialize(deserializer)?;
        let expected = items.len();
        let map: BTreeMap<V::Key, V> = items.into_iter().map(|v| (v.key(), v)).collect();
        if map.len() != expected {
            return Err(D::Error::custom("duplicate id in collection"));
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_round_trips_as_number() {
        let json = serde_json::to_string(&TaxRate::Low).unwrap();
        assert_eq!(json, "0.4");
        let back: TaxRate = serde_json::from_str("0.8").unwrap();
        assert_eq!(back, TaxRate::High);
        assert!(serde_json::from_str::<TaxRate>("0.5").is_err());
    }

    #[test]
    fn recruit_multiplier_defaults_to_standard_row() {
        assert_eq!(TaxRate::Low.recruit_multiplier(), 230);
        assert_eq!(TaxRate::Standard.recruit_multiplier(), 200);
        assert_eq!(TaxRate::High.recruit_multiplier(), 180);
        assert_eq!(recruit_multiplier_for(0.55), 200);
    }

    #[test]
    fn collections_serialize_as_arrays() {
        let mut world = World::default();
        world.special_products.insert(
            "salt".into(),
            SpecialProduct {
                name: "salt".into(),
                kokudaka: 5000,
                horse_output: 0,
                soldier_bonus: 20,
                kokudaka_bonus_pct: 0,
                other_effects: String::new(),
            },
        );
        let v = serde_json::to_value(&world).unwrap();
        assert!(v["specialProducts"].is_array());
        assert_eq!(v["specialProducts"][0]["name"], "salt");

        let back: World = serde_json::from_value(v).unwrap();
        assert_eq!(back, world);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = serde_json::json!({
            "factions": [], "territories": [], "legions": [], "specialProducts": [],
            "samurai": [
                {"id": "s1", "name": "a", "archetype": "warrior", "martial": 1, "civil": 1,
                 "isIdle": true, "actionPoints": 2},
                {"id": "s1", "name": "b", "archetype": "warrior", "martial": 1, "civil": 1,
                 "isIdle": true, "actionPoints": 2}
            ],
            "gameState": {"currentYear": 1, "isLocked": false, "adminCode": "x"}
        });
        assert!(serde_json::from_value::<World>(doc).is_err());
    }
}
