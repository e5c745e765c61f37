//! Tunable game rules.
//!
//! Injected into the engine rather than read from globals. Every field has
//! a default, so a partial JSON document overrides only what it names.

use serde::{Deserialize, Serialize};

use crate::domain::EquipmentKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EquipmentPrices {
    pub rifle: u64,
    pub horse: u64,
    pub cannon: u64,
}

impl Default for EquipmentPrices {
    fn default() -> Self {
        Self {
            rifle: 10,
            horse: 12,
            cannon: 450,
        }
    }
}

impl EquipmentPrices {
    pub fn unit_price(&self, kind: EquipmentKind) -> u64 {
        match kind {
            EquipmentKind::Rifles => self.rifle,
            EquipmentKind::Horses => self.horse,
            EquipmentKind::Cannons => self.cannon,
        }
    }
}

/// Fixed cost and base yield of one investment track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackRule {
    pub cost: u64,
    pub base_points: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvestmentRules {
    pub agriculture: TrackRule,
    pub navy: TrackRule,
    pub armament: TrackRule,
    /// Commerce yields `floor(amount / commerce_divisor)` base points.
    pub commerce_divisor: u64,
}

impl Default for InvestmentRules {
    fn default() -> Self {
        Self {
            agriculture: TrackRule {
                cost: 2000,
                base_points: 8,
            },
            navy: TrackRule {
                cost: 3000,
                base_points: 8,
            },
            armament: TrackRule {
                cost: 3000,
                base_points: 8,
            },
            commerce_divisor: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameRules {
    pub prices: EquipmentPrices,
    /// Treasury cost per idle soldier released.
    pub soldier_disband_cost: u64,
    /// Action points every samurai gets back at the start of a year.
    pub max_action_points: u8,
    pub investment: InvestmentRules,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            prices: EquipmentPrices::default(),
            soldier_disband_cost: 2,
            max_action_points: 2,
            investment: InvestmentRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let rules: GameRules =
            serde_json::from_str(r#"{"prices": {"cannon": 500}}"#).unwrap();
        assert_eq!(rules.prices.cannon, 500);
        assert_eq!(rules.prices.rifle, 10);
        assert_eq!(rules.soldier_disband_cost, 2);
        assert_eq!(rules.investment.commerce_divisor, 1000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<GameRules>(r#"{"taxes": 1}"#).is_err());
    }
}
