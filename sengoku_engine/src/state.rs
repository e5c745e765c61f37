//! World construction.
//!
//! `create_initial_state` gives the empty year-one world the admin tooling
//! imports into. `WorldBuilder` assembles consistent worlds for tests, the
//! demo seed and fixtures: it keeps the faction ID lists, samurai
//! assignments and territory owners in step as entities are added.

use crate::domain::{
    Archetype, Equipment, Faction, FactionId, GameState, InvestmentPoints, Legion, LegionId,
    Samurai, SamuraiId, SpecialProduct, TaxRate, Territory, TerritoryId, World,
};

/// Fresh, empty world at year one.
pub fn create_initial_state(admin_code: &str) -> World {
    World {
        game_state: GameState {
            admin_code: admin_code.to_string(),
            ..GameState::default()
        },
        ..World::default()
    }
}

#[derive(Debug)]
pub struct WorldBuilder {
    world: World,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            world: create_initial_state("admin"),
        }
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.world.game_state.is_locked = locked;
        self
    }

    pub fn faction(self, id: &str, name: &str) -> Self {
        self.faction_with_inventory(id, name, 0, 0, Equipment::default())
    }

    pub fn faction_with_inventory(
        mut self,
        id: &str,
        name: &str,
        treasury: u64,
        idle_soldiers: u64,
        equipment: Equipment,
    ) -> Self {
        let faction = Faction {
            id: FactionId::new(id),
            name: name.to_string(),
            leader_name: format!("{name} leader"),
            login_code: format!("{id}-code"),
            tax_rate: TaxRate::Standard,
            treasury,
            idle_soldiers,
            equipment,
            investment: InvestmentPoints::default(),
            industry_kokudaka: 0,
            territory_ids: Vec::new(),
            samurai_ids: Vec::new(),
            legion_ids: Vec::new(),
            diplomacy: Vec::new(),
            buffs: Vec::new(),
            tax_changed_year: None,
        };
        self.world.factions.insert(faction.id.clone(), faction);
        self
    }

    /// Apply an arbitrary edit to an already-added faction.
    pub fn with_faction(mut self, id: &str, edit: impl FnOnce(&mut Faction)) -> Self {
        if let Some(faction) = self.world.factions.get_mut(&FactionId::new(id)) {
            edit(faction);
        }
        self
    }

    pub fn territory(self, id: &str, province: &str, kokudaka: u64, owner: Option<&str>) -> Self {
        self.territory_with_products(id, province, kokudaka, owner, &[])
    }

    pub fn territory_with_products(
        mut self,
        id: &str,
        province: &str,
        kokudaka: u64,
        owner: Option<&str>,
        products: &[&str],
    ) -> Self {
        let territory = Territory {
            id: TerritoryId::new(id),
            province: province.to_string(),
            district: province.to_string(),
            castle_name: format!("{id} castle"),
            castle_level: 1,
            kokudaka,
            special_products: products.iter().map(|p| p.to_string()).collect(),
            owner: owner.map(FactionId::new),
            garrison: None,
        };
        if let Some(faction) = owner.and_then(|o| self.world.factions.get_mut(&FactionId::new(o))) {
            faction.territory_ids.push(territory.id.clone());
        }
        self.world.territories.insert(territory.id.clone(), territory);
        self
    }

    pub fn special_product(
        mut self,
        name: &str,
        kokudaka: u64,
        horse_output: u64,
        soldier_bonus: u64,
    ) -> Self {
        self.world.special_products.insert(
            name.to_string(),
            SpecialProduct {
                name: name.to_string(),
                kokudaka,
                horse_output,
                soldier_bonus,
                kokudaka_bonus_pct: 0,
                other_effects: String::new(),
            },
        );
        self
    }

    pub fn samurai(
        mut self,
        id: &str,
        name: &str,
        faction: Option<&str>,
        martial: i32,
        civil: i32,
    ) -> Self {
        let samurai = Samurai {
            id: SamuraiId::new(id),
            name: name.to_string(),
            archetype: if martial >= civil {
                Archetype::Warrior
            } else {
                Archetype::Strategist
            },
            martial,
            civil,
            faction_id: faction.map(FactionId::new),
            is_idle: true,
            action_points: 2,
            current_legion_id: None,
        };
        if let Some(f) = faction.and_then(|f| self.world.factions.get_mut(&FactionId::new(f))) {
            f.samurai_ids.push(samurai.id.clone());
        }
        self.world.samurai.insert(samurai.id.clone(), samurai);
        self
    }

    /// Add a legion commanded by an already-added samurai; it joins the
    /// commander's faction.
    pub fn legion(
        mut self,
        id: &str,
        name: &str,
        commander: &str,
        soldiers: u64,
        equipment: Equipment,
        location: &str,
    ) -> Self {
        let legion_id = LegionId::new(id);
        let Some(officer) = self.world.samurai.get_mut(&SamuraiId::new(commander)) else {
            return self;
        };
        let Some(faction_id) = officer.faction_id.clone() else {
            return self;
        };
        officer.current_legion_id = Some(legion_id.clone());
        officer.is_idle = false;
        let commander_name = officer.name.clone();

        let location_name = self
            .world
            .territories
            .get(&TerritoryId::new(location))
            .map(|t| t.castle_name.clone())
            .unwrap_or_default();
        if let Some(faction) = self.world.factions.get_mut(&faction_id) {
            faction.legion_ids.push(legion_id.clone());
        }
        self.world.legions.insert(
            legion_id.clone(),
            Legion {
                id: legion_id,
                name: name.to_string(),
                commander_id: SamuraiId::new(commander),
                commander_name,
                soldiers,
                equipment,
                location_id: TerritoryId::new(location),
                location_name,
                faction_id,
            },
        );
        self
    }

    pub fn build(self) -> World {
        self.world
    }
}

/// A small two-clan world for the operator CLI's `seed-demo`.
pub fn demo_world() -> World {
    WorldBuilder::new()
        .faction_with_inventory("oda", "Oda", 20_000, 1_200, Equipment::new(300, 80, 2))
        .faction_with_inventory("imagawa", "Imagawa", 35_000, 1_800, Equipment::new(150, 120, 1))
        .special_product("salt", 6_000, 0, 40)
        .special_product("kiso-horses", 0, 25, 0)
        .special_product("pottery", 4_000, 0, 0)
        .territory_with_products("kiyosu", "Owari", 180_000, Some("oda"), &["pottery"])
        .territory_with_products("tsushima", "Owari", 140_000, Some("oda"), &["salt"])
        .territory("sunpu", "Suruga", 150_000, Some("imagawa"))
        .territory_with_products("kakegawa", "Totomi", 120_000, Some("imagawa"), &["kiso-horses"])
        .territory("hamamatsu", "Totomi", 110_000, None)
        .samurai("nobunaga", "Oda Nobunaga", Some("oda"), 92, 85)
        .samurai("hideyoshi", "Kinoshita Tokichiro", Some("oda"), 70, 95)
        .samurai("yoshimoto", "Imagawa Yoshimoto", Some("imagawa"), 68, 88)
        .samurai("sessai", "Taigen Sessai", Some("imagawa"), 60, 97)
        .legion("legion-demo-1", "赤母衣衆", "nobunaga", 400, Equipment::new(100, 30, 0), "kiyosu")
        .build()
}
