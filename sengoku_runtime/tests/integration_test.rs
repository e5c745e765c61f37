//! Integration tests for sengoku_runtime.
//!
//! All tests use temporary directories for isolation.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use sengoku_engine::commands::{Actor, Command, EquipmentRequest};
use sengoku_engine::domain::FactionId;
use sengoku_engine::error::LedgerError;
use sengoku_engine::investment::FixedRoll;
use sengoku_engine::state::demo_world;

use sengoku_runtime::config::RuntimeConfig;
use sengoku_runtime::error::{RuntimeError, SessionError};
use sengoku_runtime::session::{GameSession, SharedGame};
use sengoku_runtime::snapshot_codec::SnapshotError;

fn open(dir: &Path) -> GameSession {
    let config = RuntimeConfig::default().with_data_dir(dir);
    GameSession::open(&config)
        .unwrap()
        .with_dice(Box::new(FixedRoll(50)))
}

/// Session over `dir` with the demo world imported.
fn seeded(dir: &Path) -> GameSession {
    let mut session = open(dir);
    let mut world = demo_world();
    world.game_state.admin_code = "admin".into();
    session.import_world(&Actor::admin(), world).unwrap();
    session
}

fn oda() -> Actor {
    Actor::player("oda")
}

// ─────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────

#[test]
fn committed_world_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let hash = {
        let mut session = seeded(dir.path());
        session
            .execute(&oda(), &Command::RecruitSoldiers { count: 100 })
            .unwrap();
        session.world_hash().unwrap()
    };

    let session = open(dir.path());
    assert_eq!(session.world_hash().unwrap(), hash);
    assert_eq!(
        session.world().factions[&FactionId::new("oda")].idle_soldiers,
        1_300
    );
    let actions: Vec<&str> = session
        .operations(10)
        .iter()
        .map(|op| op.action.as_str())
        .collect();
    assert_eq!(actions, vec!["recruit_soldiers", "import_world"]);
}

#[test]
fn lock_persists_and_gates_players() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut session = seeded(dir.path());
        session
            .execute(&Actor::admin(), &Command::SetLock { locked: true })
            .unwrap();
    }
    let mut session = open(dir.path());
    let err = session
        .execute(&oda(), &Command::RecruitSoldiers { count: 10 })
        .unwrap_err();
    assert!(matches!(err, SessionError::Rejected(LedgerError::GameLocked)));

    let acting = Actor::Admin {
        acting_for: Some(FactionId::new("oda")),
    };
    session
        .execute(&acting, &Command::RecruitSoldiers { count: 10 })
        .unwrap();
    assert_eq!(session.operations(1)[0].actor, "admin(oda)");
}

// ─────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────

#[test]
fn restore_rewinds_later_changes() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded(dir.path());
    session
        .execute(&Actor::admin(), &Command::AdvanceYear)
        .unwrap();
    let after_advance = session.world().clone();
    let snap = session.snapshots().unwrap().pop().unwrap();
    assert_eq!(snap.year, 2);
    assert_eq!(session.operations(1)[0].snapshot_id.as_deref(), Some(snap.id.as_str()));

    session
        .execute(
            &oda(),
            &Command::PurchaseEquipment {
                equipment: EquipmentRequest {
                    rifles: 10,
                    horses: 0,
                    cannons: 0,
                },
            },
        )
        .unwrap();
    session
        .execute(&oda(), &Command::ChangeTaxRate { rate: 0.8 })
        .unwrap();
    assert_ne!(session.world(), &after_advance);

    assert!(session.restore_from_snapshot(&Actor::admin(), &snap.id).unwrap());
    assert_eq!(session.world(), &after_advance);
    assert_eq!(session.world_hash().unwrap(), snap.hash);

    let op = &session.operations(1)[0];
    assert_eq!(op.action, "restore_snapshot");
    assert_eq!(op.details["snapshotId"], snap.id.as_str());

    drop(session);
    assert_eq!(open(dir.path()).world(), &after_advance);
}

#[test]
fn unknown_snapshot_is_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded(dir.path());
    let before = session.world().clone();
    assert!(!session
        .restore_from_snapshot(&Actor::admin(), "snap-000404")
        .unwrap());
    assert!(!session
        .restore_from_snapshot(&Actor::admin(), "factions")
        .unwrap());
    assert_eq!(session.world(), &before);
    assert_eq!(session.operations(10).len(), 1);

    let err = session
        .restore_from_snapshot(&oda(), "snap-000001")
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Rejected(LedgerError::AdminOnly { .. })
    ));
}

#[test]
fn tampered_snapshot_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded(dir.path());
    session
        .execute(&Actor::admin(), &Command::AdvanceYear)
        .unwrap();
    let before = session.world().clone();

    let path = dir.path().join("snapshots").join("snap-000001.json");
    let mut doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    doc["world"]["gameState"]["currentYear"] = serde_json::json!(99);
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let err = session
        .restore_from_snapshot(&Actor::admin(), "snap-000001")
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Runtime(RuntimeError::Snapshot(SnapshotError::HashMismatch { .. }))
    ));
    assert_eq!(session.world(), &before);
}

#[test]
fn snapshot_and_log_caps_hold() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded(dir.path());
    for i in 0..110 {
        session
            .execute(&Actor::admin(), &Command::SetLock { locked: i % 2 == 0 })
            .unwrap();
    }

    let snapshots = session.snapshots().unwrap();
    assert_eq!(snapshots.len(), 20);
    assert_eq!(snapshots[0].id, "snap-000092");
    assert_eq!(snapshots[19].id, "snap-000111");

    let ops = session.operations(usize::MAX);
    assert_eq!(ops.len(), 100);
    assert_eq!(ops[0].id, "op-000111");
    assert_eq!(ops[99].id, "op-000012");

    drop(session);
    let reopened = open(dir.path());
    assert_eq!(reopened.operations(usize::MAX).len(), 100);
    assert_eq!(reopened.snapshots().unwrap().len(), 20);
}

#[test]
fn failed_world_save_leaves_no_restorable_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = seeded(dir.path());
    let before = session.world().clone();
    let state_file = dir.path().join("game_state.json");
    fs::remove_file(&state_file).unwrap();
    fs::create_dir(&state_file).unwrap();

    let err = session
        .execute(&Actor::admin(), &Command::AdvanceYear)
        .unwrap_err();
    assert!(matches!(err, SessionError::Runtime(_)));
    assert_eq!(session.world(), &before);
    let actions: Vec<&str> = session
        .operations(10)
        .iter()
        .map(|op| op.action.as_str())
        .collect();
    assert_eq!(actions, vec!["import_world"]);
    assert_eq!(session.snapshots().unwrap().len(), 1);
    assert!(!session
        .restore_from_snapshot(&Actor::admin(), "snap-000002")
        .unwrap());

    fs::remove_dir(&state_file).unwrap();
    session
        .execute(&Actor::admin(), &Command::AdvanceYear)
        .unwrap();
    let op = &session.operations(1)[0];
    assert_eq!(op.id, "op-000002");
    let snapshot_id = op.snapshot_id.clone().unwrap();
    let linked: Vec<_> = session
        .snapshots()
        .unwrap()
        .into_iter()
        .filter(|s| s.id == snapshot_id)
        .collect();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].operation_id.as_deref(), Some("op-000002"));
}

#[test]
fn failed_log_save_discards_snapshot_and_prunes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RuntimeConfig::default().with_data_dir(dir.path());
    config.snapshot_capacity = 1;
    let mut session = GameSession::open(&config)
        .unwrap()
        .with_dice(Box::new(FixedRoll(50)));
    session.import_world(&Actor::admin(), demo_world()).unwrap();
    let before = session.world().clone();

    let log_file = dir.path().join("operations.json");
    fs::remove_file(&log_file).unwrap();
    fs::create_dir(&log_file).unwrap();

    let err = session
        .execute(&Actor::admin(), &Command::AdvanceYear)
        .unwrap_err();
    assert!(matches!(err, SessionError::Runtime(_)));
    assert_eq!(session.world(), &before);
    assert_eq!(session.operations(10).len(), 1);

    let ids: Vec<String> = session
        .snapshots()
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["snap-000001"]);
    assert!(!session
        .restore_from_snapshot(&Actor::admin(), "snap-000002")
        .unwrap());
    assert!(!dir.path().join("snapshots").join("snap-000002.json").exists());

    fs::remove_dir(&log_file).unwrap();
    assert!(session
        .restore_from_snapshot(&Actor::admin(), "snap-000001")
        .unwrap());
    assert_eq!(session.world(), &before);
}

// ─────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────

#[test]
fn concurrent_writers_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let game = Arc::new(SharedGame::new(seeded(dir.path())));

    let handles: Vec<_> = ["oda", "imagawa", "oda", "imagawa"]
        .into_iter()
        .map(|faction| {
            let game = Arc::clone(&game);
            thread::spawn(move || {
                for _ in 0..5 {
                    game.execute(&Actor::player(faction), &Command::RecruitSoldiers { count: 1 })
                        .unwrap();
                    game.economic_report(&FactionId::new(faction)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    game.with_session(|session| {
        let factions = &session.world().factions;
        assert_eq!(factions[&FactionId::new("oda")].idle_soldiers, 1_210);
        assert_eq!(factions[&FactionId::new("imagawa")].idle_soldiers, 1_810);
    });
    let ops = game.operations(usize::MAX);
    assert_eq!(ops.len(), 21);
    assert_eq!(ops[0].id, "op-000021");

    let hash = game.world_hash().unwrap();
    drop(game);
    assert_eq!(open(dir.path()).world_hash().unwrap(), hash);
}
