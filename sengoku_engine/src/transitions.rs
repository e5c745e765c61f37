//! Command dispatch.
//!
//! `apply_command` never touches the world it is given: it clones it,
//! applies the command to the clone and hands the candidate back with the
//! outcome. The engine decides whether the candidate is committed.

use serde::Serialize;

use crate::commands::{Actor, Command};
use crate::config::GameRules;
use crate::domain::{Legion, TaxRate, TerritoryId, World};
use crate::error::LedgerError;
use crate::investment::{self, DiceRoller, InvestmentReport};
use crate::ledger::{self, CreatedLegion, Inventory, Purchase};
use crate::turn::{self, YearReport};

/// What a committed command produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    LegionCreated(CreatedLegion),
    LegionDisbanded { legion: Legion },
    LegionUpdated { legion: Legion },
    Recruited { inventory: Inventory },
    Purchased(Purchase),
    SoldiersDisbanded(Purchase),
    TaxRateChanged { rate: TaxRate },
    Invested(InvestmentReport),
    LockChanged { locked: bool, previous: bool },
    SpecialProductsAssigned {
        territory_id: TerritoryId,
        products: Vec<String>,
    },
    YearAdvanced(YearReport),
}

/// Role and lock gates, checked before any argument is looked at.
fn check_gates(world: &World, actor: &Actor, command: &Command) -> Result<(), LedgerError> {
    if command.is_privileged() && !actor.is_admin() {
        return Err(LedgerError::AdminOnly {
            action: command.action_name(),
        });
    }
    if world.game_state.is_locked && !actor.is_admin() {
        return Err(LedgerError::GameLocked);
    }
    Ok(())
}

/// Apply `command` to a copy of `world`; returns `(candidate, outcome)`.
pub fn apply_command(
    world: &World,
    rules: &GameRules,
    actor: &Actor,
    command: &Command,
    dice: &mut dyn DiceRoller,
) -> Result<(World, CommandOutcome), LedgerError> {
    check_gates(world, actor, command)?;
    let mut next = world.clone();

    let outcome = match command {
        Command::SetLock { locked } => CommandOutcome::LockChanged {
            locked: *locked,
            previous: ledger::set_lock(&mut next, *locked),
        },
        Command::AssignSpecialProducts {
            territory_id,
            products,
        } => CommandOutcome::SpecialProductsAssigned {
            territory_id: territory_id.clone(),
            products: ledger::assign_special_products(&mut next, territory_id, products)?,
        },
        Command::AdvanceYear => CommandOutcome::YearAdvanced(turn::advance_year(&mut next, rules)?),
        Command::CreateLegion(request) => CommandOutcome::LegionCreated(ledger::create_legion(
            &mut next,
            actor.faction_id()?,
            request,
        )?),
        Command::DisbandLegion { legion_id } => CommandOutcome::LegionDisbanded {
            legion: ledger::disband_legion(&mut next, actor.faction_id()?, legion_id)?,
        },
        Command::UpdateLegionSoldiers {
            legion_id,
            soldiers,
        } => CommandOutcome::LegionUpdated {
            legion: ledger::update_legion_soldiers(
                &mut next,
                actor.faction_id()?,
                legion_id,
                *soldiers,
            )?,
        },
        Command::UpdateLegionEquipment {
            legion_id,
            equipment,
        } => CommandOutcome::LegionUpdated {
            legion: ledger::update_legion_equipment(
                &mut next,
                actor.faction_id()?,
                legion_id,
                equipment,
            )?,
        },
        Command::RecruitSoldiers { count } => CommandOutcome::Recruited {
            inventory: ledger::recruit_soldiers(&mut next, actor.faction_id()?, *count)?,
        },
        Command::PurchaseEquipment { equipment } => CommandOutcome::Purchased(
            ledger::purchase_equipment(&mut next, rules, actor.faction_id()?, equipment)?,
        ),
        Command::DisbandSoldiers { count } => CommandOutcome::SoldiersDisbanded(
            ledger::disband_soldiers(&mut next, rules, actor.faction_id()?, *count)?,
        ),
        Command::ChangeTaxRate { rate } => CommandOutcome::TaxRateChanged {
            rate: ledger::change_tax_rate(&mut next, actor.faction_id()?, *rate)?,
        },
        Command::Invest(request) => CommandOutcome::Invested(investment::execute(
            &mut next,
            rules,
            actor.faction_id()?,
            request,
            dice,
        )?),
    };

    Ok((next, outcome))
}
