//! Resource ledger: legions, soldiers, equipment, taxes and the admin
//! edits to the map.
//!
//! Every operation validates completely against the current world before
//! its first write, so a returned error means nothing changed.

use serde::Serialize;

use crate::arithmetic::{non_negative, positive, validate_legion_name};
use crate::commands::{CreateLegion, EquipmentRequest};
use crate::config::GameRules;
use crate::domain::{
    Equipment, EquipmentKind, Faction, FactionId, Legion, LegionId, TaxRate, TerritoryId, World,
    MAX_SPECIAL_PRODUCTS,
};
use crate::economy::faction_report;
use crate::error::{EntityKind, LedgerError, Resource};

/// A faction's unassigned holdings after an inventory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub treasury: u64,
    pub idle_soldiers: u64,
    pub equipment: Equipment,
}

impl From<&Faction> for Inventory {
    fn from(faction: &Faction) -> Self {
        Self {
            treasury: faction.treasury,
            idle_soldiers: faction.idle_soldiers,
            equipment: faction.equipment,
        }
    }
}

fn equipment_resource(kind: EquipmentKind) -> Resource {
    match kind {
        EquipmentKind::Rifles => Resource::Rifles,
        EquipmentKind::Horses => Resource::Horses,
        EquipmentKind::Cannons => Resource::Cannons,
    }
}

/// Validate a request's three counts as non-negative.
fn requested_equipment(request: &EquipmentRequest) -> Result<Equipment, LedgerError> {
    Ok(Equipment {
        rifles: non_negative("rifles", request.rifles)?,
        horses: non_negative("horses", request.horses)?,
        cannons: non_negative("cannons", request.cannons)?,
    })
}

fn faction<'a>(world: &'a World, faction_id: &FactionId) -> Result<&'a Faction, LedgerError> {
    world
        .factions
        .get(faction_id)
        .ok_or_else(|| LedgerError::not_found(EntityKind::Faction, faction_id))
}

fn faction_mut<'a>(
    world: &'a mut World,
    faction_id: &FactionId,
) -> Result<&'a mut Faction, LedgerError> {
    world
        .factions
        .get_mut(faction_id)
        .ok_or_else(|| LedgerError::not_found(EntityKind::Faction, faction_id))
}

fn not_owned(entity: EntityKind, id: impl ToString, faction_id: &FactionId) -> LedgerError {
    LedgerError::NotOwned {
        entity,
        id: id.to_string(),
        faction_id: faction_id.to_string(),
    }
}

/// A legion that exists and belongs to the faction.
fn owned_legion<'a>(
    world: &'a World,
    faction_id: &FactionId,
    legion_id: &LegionId,
) -> Result<&'a Legion, LedgerError> {
    faction(world, faction_id)?;
    let legion = world
        .legions
        .get(legion_id)
        .ok_or_else(|| LedgerError::not_found(EntityKind::Legion, legion_id))?;
    if &legion.faction_id != faction_id {
        return Err(not_owned(EntityKind::Legion, legion_id, faction_id));
    }
    Ok(legion)
}

fn mint_legion_id(world: &mut World) -> LegionId {
    loop {
        let serial = world.game_state.next_serial;
        world.game_state.next_serial += 1;
        let id = LegionId::new(format!("legion-{serial}"));
        if !world.legions.contains_key(&id) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// Legions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLegion {
    pub legion: Legion,
    /// Legion disbanded to free the commander, when reassignment was forced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<LegionId>,
}

pub fn create_legion(
    world: &mut World,
    faction_id: &FactionId,
    request: &CreateLegion,
) -> Result<CreatedLegion, LedgerError> {
    let owner = faction(world, faction_id)?;
    let name = validate_legion_name(&request.name)?;

    let commander = world
        .samurai
        .get(&request.commander_id)
        .ok_or_else(|| LedgerError::not_found(EntityKind::Samurai, &request.commander_id))?;
    if commander.faction_id.as_ref() != Some(faction_id) {
        return Err(not_owned(EntityKind::Samurai, &commander.id, faction_id));
    }

    // The legion this commander already leads, if any. Under a forced
    // reassignment its holdings return to inventory in the same commit.
    let conflicting = world
        .legions
        .values()
        .find(|l| l.commander_id == commander.id);
    let released = match conflicting {
        Some(existing) if !request.force_reassign => {
            return Err(LedgerError::CommanderConflict {
                samurai_id: commander.id.clone(),
                legion_id: existing.id.clone(),
                legion_name: existing.name.clone(),
            });
        }
        Some(existing) => Some(existing),
        None => None,
    };
    let (released_soldiers, released_equipment) = released
        .map(|l| (l.soldiers, l.equipment))
        .unwrap_or_default();

    let soldiers = positive("soldiers", request.soldiers)?;
    let available_soldiers = owner.idle_soldiers + released_soldiers;
    if soldiers > available_soldiers {
        return Err(LedgerError::insufficient(
            Resource::Soldiers,
            soldiers,
            available_soldiers,
        ));
    }

    let equipment = requested_equipment(&request.equipment)?;
    let available_equipment = owner.equipment.saturating_add(released_equipment);
    for kind in EquipmentKind::ALL {
        if equipment.get(kind) > available_equipment.get(kind) {
            return Err(LedgerError::insufficient(
                equipment_resource(kind),
                equipment.get(kind),
                available_equipment.get(kind),
            ));
        }
    }

    let location = world
        .territories
        .get(&request.location_id)
        .ok_or_else(|| LedgerError::not_found(EntityKind::Territory, &request.location_id))?;
    if location.owner.as_ref() != Some(faction_id) {
        return Err(not_owned(EntityKind::Territory, &location.id, faction_id));
    }
    let location_name = location.castle_name.clone();
    let commander_name = commander.name.clone();
    let replaced = released.map(|l| l.id.clone());

    // Commit.
    if let Some(old) = &replaced {
        disband_legion(world, faction_id, old)?;
    }
    let id = mint_legion_id(world);
    let owner = faction_mut(world, faction_id)?;
    owner.idle_soldiers -= soldiers;
    for kind in EquipmentKind::ALL {
        *owner.equipment.get_mut(kind) -= equipment.get(kind);
    }
    owner.legion_ids.push(id.clone());

    if let Some(commander) = world.samurai.get_mut(&request.commander_id) {
        commander.is_idle = false;
        commander.current_legion_id = Some(id.clone());
    }

    let legion = Legion {
        id: id.clone(),
        name,
        commander_id: request.commander_id.clone(),
        commander_name,
        soldiers,
        equipment,
        location_id: request.location_id.clone(),
        location_name,
        faction_id: faction_id.clone(),
    };
    world.legions.insert(id, legion.clone());
    Ok(CreatedLegion { legion, replaced })
}

/// Return the legion's soldiers and equipment to inventory and free its
/// commander.
pub fn disband_legion(
    world: &mut World,
    faction_id: &FactionId,
    legion_id: &LegionId,
) -> Result<Legion, LedgerError> {
    owned_legion(world, faction_id, legion_id)?;
    let Some(legion) = world.legions.remove(legion_id) else {
        return Err(LedgerError::not_found(EntityKind::Legion, legion_id));
    };

    if let Some(owner) = world.factions.get_mut(faction_id) {
        owner.idle_soldiers += legion.soldiers;
        owner.equipment = owner.equipment.saturating_add(legion.equipment);
        owner.legion_ids.retain(|id| id != legion_id);
    }
    if let Some(commander) = world.samurai.get_mut(&legion.commander_id) {
        if commander.current_legion_id.as_ref() == Some(legion_id) {
            commander.current_legion_id = None;
            commander.is_idle = true;
        }
    }
    for territory in world.territories.values_mut() {
        if territory.garrison.as_ref() == Some(legion_id) {
            territory.garrison = None;
        }
    }
    Ok(legion)
}

pub fn update_legion_soldiers(
    world: &mut World,
    faction_id: &FactionId,
    legion_id: &LegionId,
    soldiers: i64,
) -> Result<Legion, LedgerError> {
    let legion = owned_legion(world, faction_id, legion_id)?;
    if soldiers <= 0 {
        return Err(LedgerError::ShouldDisband {
            legion_id: legion_id.clone(),
            requested: soldiers,
        });
    }
    let target = soldiers.unsigned_abs();
    let current = legion.soldiers;
    let idle = faction(world, faction_id)?.idle_soldiers;
    if target > current && target - current > idle {
        return Err(LedgerError::insufficient(
            Resource::Soldiers,
            target - current,
            idle,
        ));
    }

    let owner = faction_mut(world, faction_id)?;
    owner.idle_soldiers = owner.idle_soldiers + current - target;
    let Some(legion) = world.legions.get_mut(legion_id) else {
        return Err(LedgerError::not_found(EntityKind::Legion, legion_id));
    };
    legion.soldiers = target;
    Ok(legion.clone())
}

/// Set a legion's equipment to the requested counts. Every increase is
/// checked against inventory before anything moves; one shortfall rejects
/// the whole request.
pub fn update_legion_equipment(
    world: &mut World,
    faction_id: &FactionId,
    legion_id: &LegionId,
    request: &EquipmentRequest,
) -> Result<Legion, LedgerError> {
    let legion = owned_legion(world, faction_id, legion_id)?;
    let target = requested_equipment(request)?;
    let current = legion.equipment;
    let inventory = faction(world, faction_id)?.equipment;
    for kind in EquipmentKind::ALL {
        let want = target.get(kind);
        let have = current.get(kind);
        if want > have && want - have > inventory.get(kind) {
            return Err(LedgerError::insufficient(
                equipment_resource(kind),
                want - have,
                inventory.get(kind),
            ));
        }
    }

    let owner = faction_mut(world, faction_id)?;
    for kind in EquipmentKind::ALL {
        let slot = owner.equipment.get_mut(kind);
        *slot = *slot + current.get(kind) - target.get(kind);
    }
    let Some(legion) = world.legions.get_mut(legion_id) else {
        return Err(LedgerError::not_found(EntityKind::Legion, legion_id));
    };
    legion.equipment = target;
    Ok(legion.clone())
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Raise idle soldiers, free of charge, up to the recruit cap.
pub fn recruit_soldiers(
    world: &mut World,
    faction_id: &FactionId,
    count: i64,
) -> Result<Inventory, LedgerError> {
    let count = positive("count", count)?;
    let report = faction_report(world, faction_id)?;
    let headroom = report
        .max_recruitable_soldiers
        .saturating_sub(report.total_soldiers);
    if count > headroom {
        return Err(LedgerError::insufficient(
            Resource::RecruitCapacity,
            count,
            headroom,
        ));
    }
    let owner = faction_mut(world, faction_id)?;
    owner.idle_soldiers += count;
    Ok(Inventory::from(&*owner))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub cost: u64,
    pub inventory: Inventory,
}

pub fn purchase_equipment(
    world: &mut World,
    rules: &GameRules,
    faction_id: &FactionId,
    request: &EquipmentRequest,
) -> Result<Purchase, LedgerError> {
    let owner = faction(world, faction_id)?;
    let wanted = requested_equipment(request)?;
    if EquipmentKind::ALL.iter().all(|k| wanted.get(*k) == 0) {
        return Err(LedgerError::validation("equipment", "nothing to purchase"));
    }
    let cost = EquipmentKind::ALL
        .into_iter()
        .try_fold(0u64, |acc, kind| {
            wanted
                .get(kind)
                .checked_mul(rules.prices.unit_price(kind))
                .and_then(|c| acc.checked_add(c))
        })
        .ok_or_else(|| LedgerError::validation("equipment", "order is too large"))?;
    if cost > owner.treasury {
        return Err(LedgerError::insufficient(
            Resource::Treasury,
            cost,
            owner.treasury,
        ));
    }

    let owner = faction_mut(world, faction_id)?;
    owner.treasury -= cost;
    owner.equipment = owner.equipment.saturating_add(wanted);
    Ok(Purchase {
        cost,
        inventory: Inventory::from(&*owner),
    })
}

/// Release idle soldiers at a per-head treasury cost.
pub fn disband_soldiers(
    world: &mut World,
    rules: &GameRules,
    faction_id: &FactionId,
    count: i64,
) -> Result<Purchase, LedgerError> {
    let owner = faction(world, faction_id)?;
    let count = positive("count", count)?;
    if count > owner.idle_soldiers {
        return Err(LedgerError::insufficient(
            Resource::Soldiers,
            count,
            owner.idle_soldiers,
        ));
    }
    let cost = count.saturating_mul(rules.soldier_disband_cost);
    if cost > owner.treasury {
        return Err(LedgerError::insufficient(
            Resource::Treasury,
            cost,
            owner.treasury,
        ));
    }

    let owner = faction_mut(world, faction_id)?;
    owner.idle_soldiers -= count;
    owner.treasury -= cost;
    Ok(Purchase {
        cost,
        inventory: Inventory::from(&*owner),
    })
}

/// One change per faction per year, to a different legal rate.
pub fn change_tax_rate(
    world: &mut World,
    faction_id: &FactionId,
    rate: f64,
) -> Result<TaxRate, LedgerError> {
    let year = world.current_year();
    let owner = faction(world, faction_id)?;
    let rate = TaxRate::from_f64(rate).ok_or_else(|| {
        LedgerError::validation("rate", format!("must be 0.4, 0.6 or 0.8 (got {rate})"))
    })?;
    if rate == owner.tax_rate {
        return Err(LedgerError::validation(
            "rate",
            format!("tax rate is already {}", rate.as_f64()),
        ));
    }
    if owner.tax_changed_year == Some(year) {
        return Err(LedgerError::TaxAlreadyChanged { year });
    }

    let owner = faction_mut(world, faction_id)?;
    owner.tax_rate = rate;
    owner.tax_changed_year = Some(year);
    Ok(rate)
}

// ---------------------------------------------------------------------------
// Admin edits
// ---------------------------------------------------------------------------

pub fn set_lock(world: &mut World, locked: bool) -> bool {
    let previous = world.game_state.is_locked;
    world.game_state.is_locked = locked;
    previous
}

/// Replace a territory's special products with up to three catalog names.
pub fn assign_special_products(
    world: &mut World,
    territory_id: &TerritoryId,
    products: &[String],
) -> Result<Vec<String>, LedgerError> {
    if !world.territories.contains_key(territory_id) {
        return Err(LedgerError::not_found(EntityKind::Territory, territory_id));
    }
    if products.len() > MAX_SPECIAL_PRODUCTS {
        return Err(LedgerError::validation(
            "products",
            format!(
                "a territory holds at most {MAX_SPECIAL_PRODUCTS} special products (got {})",
                products.len()
            ),
        ));
    }
    let mut names: Vec<String> = Vec::with_capacity(products.len());
    for raw in products {
        let name = raw.trim();
        if !world.special_products.contains_key(name) {
            return Err(LedgerError::UnknownSpecialProduct {
                name: name.to_string(),
            });
        }
        if names.iter().any(|n| n == name) {
            return Err(LedgerError::validation(
                "products",
                format!("{name:?} is listed twice"),
            ));
        }
        names.push(name.to_string());
    }

    let Some(territory) = world.territories.get_mut(territory_id) else {
        return Err(LedgerError::not_found(EntityKind::Territory, territory_id));
    };
    territory.special_products = names.clone();
    Ok(names)
}
