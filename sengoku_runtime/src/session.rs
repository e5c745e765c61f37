//! Game session: the engine plus everything that makes a commit durable.
//!
//! Commit order for a command:
//!   1. engine.apply (validation, invariants, conservation)
//!   2. operation record
//!   3. world files written to disk
//!   4. linked snapshot for admin commands
//!   5. operation log written to disk; this is the commit point
//!   6. old snapshots pruned
//!
//! If steps 3-5 fail, the engine and the log are put back to where they
//! were before step 1 and a snapshot written in step 4 is deleted, so
//! neither memory nor the snapshot directory runs ahead of the log.
//!
//! Concurrency: `SharedGame` wraps one session in an `RwLock`. Commands
//! and restores take the write lock; reports take the read lock.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::json;
use tracing::{error, info, warn};

use sengoku_engine::commands::{Actor, Command, Invest};
use sengoku_engine::domain::{FactionId, World};
use sengoku_engine::economy::EconomicReport;
use sengoku_engine::engine::GameEngine;
use sengoku_engine::error::LedgerError;
use sengoku_engine::investment::{DiceRoller, InvestmentQuote, RandomDice};
use sengoku_engine::state::create_initial_state;
use sengoku_engine::transitions::CommandOutcome;

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, SessionError};
use crate::operation_log::{OperationLog, OperationRecord};
use crate::snapshot::{SnapshotStore, SnapshotSummary};
use crate::snapshot_codec::restore_snapshot;
use crate::store::FileStore;

pub type Dice = Box<dyn DiceRoller + Send + Sync>;

pub struct GameSession {
    engine: GameEngine,
    store: FileStore,
    log: OperationLog,
    snapshots: SnapshotStore,
    dice: Dice,
}

impl GameSession {
    /// Open the data directory named by `config`, starting from an empty
    /// year-one world if nothing has been saved there yet.
    pub fn open(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let store = FileStore::open(&config.data_dir)?;
        let world = match store.load_world()? {
            Some(world) => world,
            None => {
                info!(dir = %store.dir().display(), "no saved world, starting fresh");
                create_initial_state(&config.admin_code)
            }
        };
        let engine = GameEngine::new(world, config.rules.clone())?;
        let log = OperationLog::from_records(store.load_operations()?, config.operation_log_capacity);
        let snapshots = SnapshotStore::open(store.snapshot_dir(), config.snapshot_capacity)?;
        let dice: Dice = match config.dice_seed {
            Some(seed) => Box::new(RandomDice::seeded(seed)),
            None => Box::new(RandomDice::from_entropy()),
        };
        info!(
            year = engine.world().current_year(),
            factions = engine.world().factions.len(),
            operations = log.records().len(),
            "session opened"
        );
        Ok(Self {
            engine,
            store,
            log,
            snapshots,
            dice,
        })
    }

    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    /// Apply one command and persist the result.
    pub fn execute(
        &mut self,
        actor: &Actor,
        command: &Command,
    ) -> Result<CommandOutcome, SessionError> {
        let details = serde_json::to_value(command).map_err(RuntimeError::from)?;
        let previous = self.engine.world().clone();
        let log_before = self.log.clone();

        let outcome = self.engine.apply(actor, command, self.dice.as_mut())?;
        let op = self.log.record(
            previous.current_year(),
            actor.label(),
            command.action_name(),
            details,
        );
        if let Err(e) = self.persist(&op.id, command.is_privileged()) {
            error!(op = %op.id, error = %e, "persist failed, rolling back");
            self.roll_back(previous, log_before);
            return Err(e.into());
        }
        Ok(outcome)
    }

    /// Replace the world with a stored snapshot. `Ok(false)` when no
    /// snapshot has that ID.
    pub fn restore_from_snapshot(
        &mut self,
        actor: &Actor,
        snapshot_id: &str,
    ) -> Result<bool, SessionError> {
        require_admin(actor, "restore_snapshot")?;
        let Some(document) = self.snapshots.load_document(snapshot_id)? else {
            warn!(snapshot_id, "restore requested for unknown snapshot");
            return Ok(false);
        };
        let snapshot = restore_snapshot(&document, self.engine.rules().max_action_points)?;

        let previous = self.engine.world().clone();
        let log_before = self.log.clone();
        self.engine
            .replace_world(snapshot.world)
            .map_err(RuntimeError::from)?;
        let op = self.log.record(
            previous.current_year(),
            actor.label(),
            "restore_snapshot",
            json!({ "snapshotId": snapshot.id, "year": snapshot.year }),
        );
        if let Err(e) = self.persist(&op.id, false) {
            error!(op = %op.id, error = %e, "persist failed, rolling back");
            self.roll_back(previous, log_before);
            return Err(e.into());
        }
        info!(snapshot_id, year = snapshot.year, "world restored from snapshot");
        Ok(true)
    }

    /// Replace the whole world, e.g. with seed data. Snapshotted like any
    /// other admin operation.
    pub fn import_world(&mut self, actor: &Actor, world: World) -> Result<(), SessionError> {
        require_admin(actor, "import_world")?;
        let previous = self.engine.world().clone();
        let log_before = self.log.clone();
        let details = json!({
            "factions": world.factions.len(),
            "territories": world.territories.len(),
            "samurai": world.samurai.len(),
            "legions": world.legions.len(),
        });
        self.engine.replace_world(world).map_err(RuntimeError::from)?;
        let op = self
            .log
            .record(previous.current_year(), actor.label(), "import_world", details);
        if let Err(e) = self.persist(&op.id, true) {
            error!(op = %op.id, error = %e, "persist failed, rolling back");
            self.roll_back(previous, log_before);
            return Err(e.into());
        }
        Ok(())
    }

    fn persist(&mut self, op_id: &str, snapshot: bool) -> Result<(), RuntimeError> {
        self.store.save_world(self.engine.world())?;
        let created = if snapshot {
            let snap = self.snapshots.create(self.engine.world(), Some(op_id))?;
            self.log.link_snapshot(op_id, &snap.id);
            Some(snap.id)
        } else {
            None
        };
        if let Err(e) = self.store.save_operations(self.log.records()) {
            if let Some(id) = created {
                if let Err(discard) = self.snapshots.discard(&id) {
                    error!(snapshot = %id, error = %discard, "could not discard uncommitted snapshot");
                }
            }
            return Err(e.into());
        }
        if let Err(e) = self.snapshots.prune() {
            warn!(error = %e, "snapshot pruning failed");
        }
        Ok(())
    }

    fn roll_back(&mut self, previous: World, log_before: OperationLog) {
        if let Err(v) = self.engine.replace_world(previous) {
            error!(rule = v.rule, detail = %v.detail, "previous world no longer valid");
        }
        self.log = log_before;
        if let Err(e) = self.store.save_world(self.engine.world()) {
            error!(error = %e, "could not rewrite previous world");
        }
    }

    pub fn world(&self) -> &World {
        self.engine.world()
    }

    pub fn world_hash(&self) -> Result<String, RuntimeError> {
        Ok(self.engine.world_hash()?)
    }

    pub fn economic_report(&self, faction_id: &FactionId) -> Result<EconomicReport, SessionError> {
        Ok(self.engine.economic_report(faction_id)?)
    }

    pub fn investment_preview(
        &self,
        faction_id: &FactionId,
        request: &Invest,
    ) -> Result<InvestmentQuote, SessionError> {
        Ok(self.engine.investment_preview(faction_id, request)?)
    }

    /// Newest first.
    pub fn operations(&self, limit: usize) -> &[OperationRecord] {
        self.log.recent(limit)
    }

    /// Oldest first.
    pub fn snapshots(&self) -> Result<Vec<SnapshotSummary>, SessionError> {
        Ok(self.snapshots.list()?)
    }
}

fn require_admin(actor: &Actor, action: &'static str) -> Result<(), LedgerError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LedgerError::AdminOnly { action })
    }
}

/// Thread-safe session handle.
pub struct SharedGame {
    inner: RwLock<GameSession>,
}

impl SharedGame {
    pub fn new(session: GameSession) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }

    // A panic mid-command happens before the world swap, so the state
    // behind a poisoned lock is still the last committed one.
    fn read(&self) -> RwLockReadGuard<'_, GameSession> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GameSession> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn execute(&self, actor: &Actor, command: &Command) -> Result<CommandOutcome, SessionError> {
        self.write().execute(actor, command)
    }

    pub fn restore_from_snapshot(&self, actor: &Actor, snapshot_id: &str) -> Result<bool, SessionError> {
        self.write().restore_from_snapshot(actor, snapshot_id)
    }

    pub fn economic_report(&self, faction_id: &FactionId) -> Result<EconomicReport, SessionError> {
        self.read().economic_report(faction_id)
    }

    pub fn operations(&self, limit: usize) -> Vec<OperationRecord> {
        self.read().operations(limit).to_vec()
    }

    pub fn world_hash(&self) -> Result<String, RuntimeError> {
        self.read().world_hash()
    }

    /// Run `f` against a consistent view of the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&GameSession) -> R) -> R {
        f(&self.read())
    }
}
