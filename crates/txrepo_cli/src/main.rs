//! Command-line request layer for the user store.
//!
//! # Responsibility
//! - Parse requests into store calls and print results as JSON.
//! - Map `NotFound` to a distinct exit status; every other failure is generic.

use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use txrepo_core::{
    init_logging, CallContext, Database, StoreConfig, StoreError, UserStore,
};
use uuid::Uuid;

const EXIT_NOT_FOUND: u8 = 4;

#[derive(Debug, Parser)]
#[command(name = "txrepo", version, about = "Create, read and update users")]
struct Cli {
    /// SQLite database file. Overrides TXREPO_DB_PATH; in-memory when unset.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Per-request deadline in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a user with a freshly minted id.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Replace name and email of an existing user.
    Update {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Show one user.
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// List all users.
    List,
}

#[derive(Debug)]
enum CliError {
    Store(StoreError),
    Encode(serde_json::Error),
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = cli.db {
        config.db_path = Some(path);
    }

    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("logging setup failed: {err}");
        return ExitCode::FAILURE;
    }

    let db = match Database::from_config(&config) {
        Ok(db) => db,
        Err(err) => {
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("cannot open database: {err}");
            return ExitCode::FAILURE;
        }
    };
    let store = UserStore::new(db);
    let ctx = match cli.timeout_ms {
        Some(ms) => CallContext::with_timeout(Duration::from_millis(ms)),
        None => CallContext::background(),
    };

    match run(&store, &ctx, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(CliError::Store(err)) if err.is_not_found() => {
            eprintln!("not found");
            ExitCode::from(EXIT_NOT_FOUND)
        }
        Err(CliError::Store(err)) => {
            error!(
                "event=cli_request module=cli status=error error_kind={:?} error={err}",
                err.kind()
            );
            if let Some(rollback) = err.repo_error().rollback_error() {
                error!(
                    "event=cli_request module=cli status=rollback_failed error_kind={:?} error={rollback}",
                    rollback.kind()
                );
            }
            eprintln!("request failed");
            ExitCode::FAILURE
        }
        Err(CliError::Encode(err)) => {
            error!("event=cli_output module=cli status=error error={err}");
            eprintln!("request failed");
            ExitCode::FAILURE
        }
    }
}

fn run(store: &UserStore, ctx: &CallContext, command: Command) -> Result<String, CliError> {
    let output = match command {
        Command::Create { name, email } => {
            serde_json::to_string_pretty(&store.create_user(ctx, name, email)?)?
        }
        Command::Update { id, name, email } => serde_json::to_string_pretty(
            &store.update_user_transactionally(ctx, id, name, email)?,
        )?,
        Command::Get { id } => serde_json::to_string_pretty(&store.find_user(ctx, id)?)?,
        Command::List => serde_json::to_string_pretty(&store.find_users(ctx)?)?,
    };
    Ok(output)
}
