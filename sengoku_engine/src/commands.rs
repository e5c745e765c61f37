//! Command definitions.
//!
//! Commands are pure data: intent plus typed arguments. They carry no
//! transition logic. Counts arrive signed, exactly as the request parser
//! produced them; `ledger` rejects negatives before touching state.

use serde::{Deserialize, Serialize};

use crate::bands::InvestmentTrack;
use crate::domain::{FactionId, LegionId, SamuraiId, TerritoryId};
use crate::error::LedgerError;

/// Who is issuing a command. Resolved by the caller's auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Actor {
    Player { faction_id: FactionId },
    Admin { acting_for: Option<FactionId> },
}

impl Actor {
    pub fn player(faction_id: impl Into<String>) -> Self {
        Actor::Player {
            faction_id: FactionId::new(faction_id),
        }
    }

    pub fn admin() -> Self {
        Actor::Admin { acting_for: None }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin { .. })
    }

    /// Faction a faction-scoped command applies to.
    pub fn faction_id(&self) -> Result<&FactionId, LedgerError> {
        match self {
            Actor::Player { faction_id } => Ok(faction_id),
            Actor::Admin {
                acting_for: Some(faction_id),
            } => Ok(faction_id),
            Actor::Admin { acting_for: None } => Err(LedgerError::validation(
                "faction_id",
                "admin must name the faction it is acting for",
            )),
        }
    }

    /// Label written into the operation log.
    pub fn label(&self) -> String {
        match self {
            Actor::Player { faction_id } => faction_id.to_string(),
            Actor::Admin { acting_for: None } => "admin".to_string(),
            Actor::Admin {
                acting_for: Some(f),
            } => format!("admin({f})"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentRequest {
    pub rifles: i64,
    pub horses: i64,
    pub cannons: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLegion {
    pub name: String,
    pub commander_id: SamuraiId,
    pub soldiers: i64,
    pub equipment: EquipmentRequest,
    pub location_id: TerritoryId,
    /// Disband whatever legion the commander currently leads instead of
    /// reporting a conflict.
    #[serde(default)]
    pub force_reassign: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invest {
    pub samurai_id: SamuraiId,
    pub track: InvestmentTrack,
    /// Commerce only: treasury spent, which also sets the base points.
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    CreateLegion(CreateLegion),
    DisbandLegion { legion_id: LegionId },
    UpdateLegionSoldiers { legion_id: LegionId, soldiers: i64 },
    UpdateLegionEquipment {
        legion_id: LegionId,
        equipment: EquipmentRequest,
    },
    RecruitSoldiers { count: i64 },
    PurchaseEquipment { equipment: EquipmentRequest },
    DisbandSoldiers { count: i64 },
    ChangeTaxRate { rate: f64 },
    Invest(Invest),
    SetLock { locked: bool },
    AssignSpecialProducts {
        territory_id: TerritoryId,
        products: Vec<String>,
    },
    AdvanceYear,
}

impl Command {
    pub fn action_name(&self) -> &'static str {
        match self {
            Command::CreateLegion(_) => "create_legion",
            Command::DisbandLegion { .. } => "disband_legion",
            Command::UpdateLegionSoldiers { .. } => "update_legion_soldiers",
            Command::UpdateLegionEquipment { .. } => "update_legion_equipment",
            Command::RecruitSoldiers { .. } => "recruit_soldiers",
            Command::PurchaseEquipment { .. } => "purchase_equipment",
            Command::DisbandSoldiers { .. } => "disband_soldiers",
            Command::ChangeTaxRate { .. } => "change_tax_rate",
            Command::Invest(_) => "invest",
            Command::SetLock { .. } => "set_lock",
            Command::AssignSpecialProducts { .. } => "assign_special_products",
            Command::AdvanceYear => "advance_year",
        }
    }

    /// Admin-only commands; each is committed with a linked snapshot.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Command::SetLock { .. } | Command::AssignSpecialProducts { .. } | Command::AdvanceYear
        )
    }

    /// Commands that only move soldiers and equipment between a faction's
    /// inventory and its legions, leaving every total unchanged.
    pub fn conserves_resources(&self) -> bool {
        matches!(
            self,
            Command::CreateLegion(_)
                | Command::DisbandLegion { .. }
                | Command::UpdateLegionSoldiers { .. }
                | Command::UpdateLegionEquipment { .. }
        )
    }
}
