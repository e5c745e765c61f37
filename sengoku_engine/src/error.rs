//! Typed rejection values returned by every kernel operation.
//!
//! Expected failures are values, not panics. Each variant maps onto one
//! `ErrorKind` so a caller can branch on the kind and show the message
//! verbatim.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{LegionId, SamuraiId};

/// Machine-checkable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InsufficientResource,
    StateGate,
    NotFoundCatalog,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientResource => "insufficient_resource",
            ErrorKind::StateGate => "state_gate",
            ErrorKind::NotFoundCatalog => "not_found_catalog",
        }
    }
}

/// Entity families that can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Faction,
    Territory,
    Samurai,
    Legion,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Faction => "faction",
            EntityKind::Territory => "territory",
            EntityKind::Samurai => "samurai",
            EntityKind::Legion => "legion",
        };
        f.write_str(s)
    }
}

/// Scarce quantities a request can run short of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Soldiers,
    Rifles,
    Horses,
    Cannons,
    Treasury,
    ActionPoints,
    RecruitCapacity,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resource::Soldiers => "idle soldiers",
            Resource::Rifles => "rifles",
            Resource::Horses => "horses",
            Resource::Cannons => "cannons",
            Resource::Treasury => "treasury",
            Resource::ActionPoints => "action points",
            Resource::RecruitCapacity => "recruit capacity",
        };
        f.write_str(s)
    }
}

/// Rejection of a ledger, investment or admin command.
///
/// Raised before any mutation; the world is untouched when one of these
/// comes back.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} {id:?} does not exist")]
    NotFound { entity: EntityKind, id: String },

    #[error("{entity} {id:?} does not belong to faction {faction_id:?}")]
    NotOwned {
        entity: EntityKind,
        id: String,
        faction_id: String,
    },

    #[error("samurai {samurai_id} already commands legion {legion_name} ({legion_id})")]
    CommanderConflict {
        samurai_id: SamuraiId,
        legion_id: LegionId,
        legion_name: String,
    },

    #[error("insufficient {resource}: required {required}, available {available}")]
    Insufficient {
        resource: Resource,
        required: u64,
        available: u64,
    },

    #[error("the game is locked")]
    GameLocked,

    #[error("tax rate was already changed in year {year}")]
    TaxAlreadyChanged { year: u32 },

    #[error("legion {legion_id} cannot be reduced to {requested} soldiers; disband it instead")]
    ShouldDisband { legion_id: LegionId, requested: i64 },

    #[error("{action} requires the admin role")]
    AdminOnly { action: &'static str },

    #[error("special product {name:?} is not in the catalog")]
    UnknownSpecialProduct { name: String },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. } => ErrorKind::Validation,
            LedgerError::NotFound { .. } | LedgerError::NotOwned { .. } => ErrorKind::NotFound,
            LedgerError::CommanderConflict { .. } => ErrorKind::Conflict,
            LedgerError::Insufficient { .. } => ErrorKind::InsufficientResource,
            LedgerError::GameLocked
            | LedgerError::TaxAlreadyChanged { .. }
            | LedgerError::ShouldDisband { .. }
            | LedgerError::AdminOnly { .. } => ErrorKind::StateGate,
            LedgerError::UnknownSpecialProduct { .. } => ErrorKind::NotFoundCatalog,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn insufficient(resource: Resource, required: u64, available: u64) -> Self {
        LedgerError::Insufficient {
            resource,
            required,
            available,
        }
    }
}
