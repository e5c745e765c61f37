#![forbid(unsafe_code)]
//! Rules kernel for the Sengoku forum game: the economic calculator, the
//! investment resolver, the resource ledger and the yearly clock, over an
//! in-memory `World`.

/// Version of the game rules; bumped whenever a formula or table changes.
pub const RULES_VERSION: u32 = 1;

pub mod arithmetic;
pub mod bands;
pub mod commands;
pub mod config;
pub mod domain;
pub mod economy;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod invariants;
pub mod investment;
pub mod ledger;
pub mod state;
pub mod transitions;
pub mod turn;
