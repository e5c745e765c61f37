//! `sengoku_admin`: run game operations against a data directory.
//!
//! Every subcommand prints one JSON response envelope on stdout; logs go
//! to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;
use tracing_subscriber::EnvFilter;

use sengoku_engine::commands::{Actor, Command, Invest};
use sengoku_engine::domain::FactionId;
use sengoku_engine::state::demo_world;

use sengoku_runtime::config::{ConfigError, RuntimeConfig};
use sengoku_runtime::error::{RuntimeError, SessionError};
use sengoku_runtime::response::Response;
use sengoku_runtime::session::GameSession;

#[derive(Parser)]
#[command(name = "sengoku_admin")]
#[command(about = "Run Sengoku game operations against a data directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file and SENGOKU_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for investment dice
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Admin code; required by admin operations
    #[arg(long, global = true)]
    admin_code: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the world with the demo scenario
    SeedDemo,
    /// Economic report for one faction
    Report { faction: String },
    /// Quote an investment without rolling
    Preview {
        faction: String,
        /// Investment request as JSON, e.g. {"samuraiId":"hideyoshi","track":"commerce","amount":5000}
        request: String,
    },
    /// Apply a command given as JSON, e.g. {"action":"recruit_soldiers","count":100}
    Exec {
        /// Faction to act for
        #[arg(short, long)]
        faction: Option<String>,
        /// Act as admin (needs --admin-code)
        #[arg(long)]
        admin: bool,
        command: String,
    },
    /// Lock the game for players
    Lock,
    /// Unlock the game
    Unlock,
    /// Advance to the next year
    AdvanceYear,
    /// List stored snapshots, oldest first
    Snapshots,
    /// Restore the world from a snapshot
    Restore { snapshot_id: String },
    /// Show recent operations, newest first
    Log {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Canonical hash of the current world
    Hash,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    let mut session = match GameSession::open(&config) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, dir = %config.data_dir.display(), "cannot open game data");
            return ExitCode::FAILURE;
        }
    };

    let response = run(&mut session, &cli);
    match serde_json::to_string_pretty(&response) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            error!(error = %e, "cannot encode response");
            return ExitCode::FAILURE;
        }
    }
    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig, ConfigError> {
    let mut config = RuntimeConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    if let Some(seed) = cli.seed {
        config.dice_seed = Some(seed);
    }
    Ok(config)
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn respond<T: Serialize>(result: Result<T, SessionError>) -> Response<Value> {
    Response::from_result(result.and_then(|data| {
        serde_json::to_value(data).map_err(|e| SessionError::from(RuntimeError::from(e)))
    }))
}

fn unauthorized() -> Response<Value> {
    Response::failure("unauthorized", "admin code missing or incorrect")
}

/// Admin actor if `--admin-code` matches the world's code.
fn admin_actor(session: &GameSession, cli: &Cli, acting_for: Option<FactionId>) -> Option<Actor> {
    let expected = &session.world().game_state.admin_code;
    match cli.admin_code.as_deref() {
        Some(code) if !expected.is_empty() && code == expected => Some(Actor::Admin { acting_for }),
        _ => None,
    }
}

fn as_admin(
    session: &mut GameSession,
    cli: &Cli,
    op: impl FnOnce(&mut GameSession, &Actor) -> Response<Value>,
) -> Response<Value> {
    match admin_actor(session, cli, None) {
        Some(actor) => op(session, &actor),
        None => unauthorized(),
    }
}

fn run(session: &mut GameSession, cli: &Cli) -> Response<Value> {
    match &cli.command {
        Commands::Report { faction } => respond(session.economic_report(&FactionId::new(faction.as_str()))),
        Commands::Preview { faction, request } => match serde_json::from_str::<Invest>(request) {
            Ok(request) => respond(session.investment_preview(&FactionId::new(faction.as_str()), &request)),
            Err(e) => Response::failure("validation", format!("invalid investment request: {e}")),
        },
        Commands::Exec {
            faction,
            admin,
            command,
        } => {
            let command: Command = match serde_json::from_str(command) {
                Ok(command) => command,
                Err(e) => return Response::failure("validation", format!("invalid command: {e}")),
            };
            let actor = if *admin {
                match admin_actor(session, cli, faction.as_deref().map(FactionId::from)) {
                    Some(actor) => actor,
                    None => return unauthorized(),
                }
            } else {
                match faction {
                    Some(f) => Actor::player(f.as_str()),
                    None => {
                        return Response::failure("validation", "--faction is required without --admin")
                    }
                }
            };
            respond(session.execute(&actor, &command))
        }
        Commands::Snapshots => respond(session.snapshots()),
        Commands::Log { limit } => respond(Ok(session.operations(*limit))),
        Commands::Hash => respond(session.world_hash().map_err(SessionError::from)),
        Commands::SeedDemo => as_admin(session, cli, |session, actor| {
            let mut world = demo_world();
            world.game_state.admin_code = session.world().game_state.admin_code.clone();
            let summary = json!({
                "year": world.current_year(),
                "factions": world.factions.len(),
                "territories": world.territories.len(),
            });
            respond(session.import_world(actor, world).map(|()| summary))
        }),
        Commands::Lock => as_admin(session, cli, |session, actor| {
            respond(session.execute(actor, &Command::SetLock { locked: true }))
        }),
        Commands::Unlock => as_admin(session, cli, |session, actor| {
            respond(session.execute(actor, &Command::SetLock { locked: false }))
        }),
        Commands::AdvanceYear => as_admin(session, cli, |session, actor| {
            respond(session.execute(actor, &Command::AdvanceYear))
        }),
        Commands::Restore { snapshot_id } => as_admin(session, cli, |session, actor| {
            match session.restore_from_snapshot(actor, snapshot_id) {
                Ok(true) => respond(Ok(json!({ "restored": snapshot_id }))),
                Ok(false) => Response::failure("not_found", format!("no snapshot {snapshot_id}")),
                Err(e) => Response::from(&e),
            }
        }),
    }
}
