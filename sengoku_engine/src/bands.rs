//! Banded lookup tables.
//!
//! Coefficients are stored as integer percentages; the `f64` accessors
//! divide once at the edge.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Soldier maintenance ratio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaintenanceBand {
    /// Inclusive upper bound of the ratio.
    pub upper: f64,
    pub bonus_pct: i64,
    pub growth_pct: i64,
}

#[rustfmt::skip]
pub static MAINTENANCE_BANDS: [MaintenanceBand; 7] = [
    MaintenanceBand { upper: 0.20, bonus_pct: 12, growth_pct: 3 },
    MaintenanceBand { upper: 0.45, bonus_pct: 6, growth_pct: 1 },
    MaintenanceBand { upper: 0.60, bonus_pct: 0, growth_pct: -1 },
    MaintenanceBand { upper: 0.80, bonus_pct: -10, growth_pct: -2 },
    MaintenanceBand { upper: 0.94, bonus_pct: -20, growth_pct: -4 },
    MaintenanceBand { upper: 1.00, bonus_pct: -30, growth_pct: -8 },
    MaintenanceBand { upper: f64::INFINITY, bonus_pct: -40, growth_pct: -12 },
];

/// Band for a soldier maintenance ratio.
///
/// Anything above 1.00 is over capacity and takes the open band. Below that
/// the ratio is clamped into `[0, 1]` and the first band whose upper bound
/// covers it wins, so values between listed hundredths fall to the next
/// band up.
pub fn maintenance_band(ratio: f64) -> &'static MaintenanceBand {
    let last = &MAINTENANCE_BANDS[MAINTENANCE_BANDS.len() - 1];
    if ratio > 1.0 {
        return last;
    }
    let clamped = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    MAINTENANCE_BANDS
        .iter()
        .find(|band| clamped <= band.upper)
        .unwrap_or(last)
}

pub fn bonus_coefficient(ratio: f64) -> f64 {
    maintenance_band(ratio).bonus_pct as f64 / 100.0
}

pub fn growth_rate(ratio: f64) -> f64 {
    maintenance_band(ratio).growth_pct as f64 / 100.0
}

// ---------------------------------------------------------------------------
// Investment levels
// ---------------------------------------------------------------------------

/// Inclusive upper point bound of each of the eight tiers.
const TIER_UPPER_BOUNDS: [u32; 8] = [0, 15, 30, 50, 70, 85, 99, 100];

/// Tier index 0..=7 for a point total; totals above 100 count as 100.
pub fn level_tier(points: u32) -> usize {
    TIER_UPPER_BOUNDS
        .iter()
        .position(|upper| points <= *upper)
        .unwrap_or(TIER_UPPER_BOUNDS.len() - 1)
}

const ARMAMENT_MODIFIER_PCT: [i64; 8] = [20, 10, 0, -10, -20, -30, -40, -50];

const AGRICULTURE_NAMES: [&str; 8] = [
    "Fallow Fields",
    "Tilled Plots",
    "Irrigated Paddies",
    "Terraced Slopes",
    "Abundant Harvest",
    "Flourishing Villages",
    "Overflowing Granaries",
    "Land of Plenty",
];

const COMMERCE_NAMES: [&str; 8] = [
    "Barter",
    "Market Days",
    "Free Markets",
    "Guild Towns",
    "Trade Hub",
    "Merchant League",
    "Great Entrepot",
    "Golden Capital",
];

const NAVY_NAMES: [&str; 8] = [
    "No Fleet",
    "Fishing Boats",
    "Coastal Patrol",
    "Kobaya Squadron",
    "Sekibune Fleet",
    "Atakebune Fleet",
    "Armoured Fleet",
    "Master of the Seas",
];

const ARMAMENT_NAMES: [&str; 8] = [
    "Unarmed",
    "Levy Spears",
    "Drilled Ashigaru",
    "Arquebus Corps",
    "Gunnery School",
    "Foundry",
    "Arsenal",
    "Invincible Host",
];

/// The four investment tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentTrack {
    Agriculture,
    Commerce,
    Navy,
    Armament,
}

impl InvestmentTrack {
    pub const ALL: [InvestmentTrack; 4] = [
        InvestmentTrack::Agriculture,
        InvestmentTrack::Commerce,
        InvestmentTrack::Navy,
        InvestmentTrack::Armament,
    ];

    fn level_names(self) -> &'static [&'static str; 8] {
        match self {
            InvestmentTrack::Agriculture => &AGRICULTURE_NAMES,
            InvestmentTrack::Commerce => &COMMERCE_NAMES,
            InvestmentTrack::Navy => &NAVY_NAMES,
            InvestmentTrack::Armament => &ARMAMENT_NAMES,
        }
    }

    pub fn level_name(self, points: u32) -> &'static str {
        self.level_names()[level_tier(points)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmamentLevel {
    pub tier: u8,
    pub name: &'static str,
    pub maintenance_modifier_pct: i64,
}

impl ArmamentLevel {
    pub fn maintenance_modifier(&self) -> f64 {
        self.maintenance_modifier_pct as f64 / 100.0
    }
}

pub fn armament_level(points: u32) -> ArmamentLevel {
    let tier = level_tier(points);
    ArmamentLevel {
        tier: tier as u8,
        name: ARMAMENT_NAMES[tier],
        maintenance_modifier_pct: ARMAMENT_MODIFIER_PCT[tier],
    }
}

// ---------------------------------------------------------------------------
// Province integration
// ---------------------------------------------------------------------------

/// Reward for holding every territory of a province with this total yield.
pub fn integration_bonus_for(province_kokudaka: u64) -> u64 {
    match province_kokudaka {
        k if k >= 300_000 => 20_000,
        k if k >= 150_000 => 10_000,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_boundaries() {
        let cases = [
            (0.0, 0.12, 0.03),
            (0.20, 0.12, 0.03),
            (0.21, 0.06, 0.01),
            (0.45, 0.06, 0.01),
            (0.46, 0.0, -0.01),
            (0.60, 0.0, -0.01),
            (0.61, -0.10, -0.02),
            (0.80, -0.10, -0.02),
            (0.81, -0.20, -0.04),
            (0.94, -0.20, -0.04),
            (0.95, -0.30, -0.08),
            (1.00, -0.30, -0.08),
            (1.01, -0.40, -0.12),
            (7.5, -0.40, -0.12),
        ];
        for (ratio, bonus, growth) in cases {
            assert_eq!(bonus_coefficient(ratio), bonus, "bonus at {ratio}");
            assert_eq!(growth_rate(ratio), growth, "growth at {ratio}");
        }
    }

    #[test]
    fn just_over_capacity_is_open_band() {
        assert_eq!(maintenance_band(1.005).bonus_pct, -40);
        assert_eq!(maintenance_band(1.0).bonus_pct, -30);
    }

    #[test]
    fn ratio_between_hundredths_falls_upward() {
        assert_eq!(maintenance_band(0.205).bonus_pct, 6);
    }

    #[test]
    fn negative_ratio_clamps_to_first_band() {
        assert_eq!(maintenance_band(-0.3).bonus_pct, 12);
    }

    #[test]
    fn armament_tiers() {
        let cases = [
            (0, 0, 20),
            (1, 1, 10),
            (15, 1, 10),
            (16, 2, 0),
            (30, 2, 0),
            (31, 3, -10),
            (50, 3, -10),
            (51, 4, -20),
            (70, 4, -20),
            (71, 5, -30),
            (85, 5, -30),
            (86, 6, -40),
            (99, 6, -40),
            (100, 7, -50),
        ];
        for (points, tier, pct) in cases {
            let level = armament_level(points);
            assert_eq!(level.tier, tier, "tier at {points}");
            assert_eq!(level.maintenance_modifier_pct, pct, "modifier at {points}");
        }
        assert_eq!(armament_level(0).maintenance_modifier(), 0.2);
        assert_eq!(armament_level(100).maintenance_modifier(), -0.5);
    }

    #[test]
    fn track_names_follow_tiers() {
        assert_eq!(InvestmentTrack::Navy.level_name(0), "No Fleet");
        assert_eq!(InvestmentTrack::Commerce.level_name(16), "Free Markets");
        assert_eq!(InvestmentTrack::Agriculture.level_name(100), "Land of Plenty");
        assert_eq!(InvestmentTrack::Armament.level_name(140), "Invincible Host");
    }

    #[test]
    fn integration_tiers() {
        assert_eq!(integration_bonus_for(350_000), 20_000);
        assert_eq!(integration_bonus_for(300_000), 20_000);
        assert_eq!(integration_bonus_for(299_999), 10_000);
        assert_eq!(integration_bonus_for(150_000), 10_000);
        assert_eq!(integration_bonus_for(149_999), 0);
    }
}
