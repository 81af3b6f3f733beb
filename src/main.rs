//! Round Snapshots: Validate, Authorize, and Commit Game-Server Round Reports
//!
//! This application ingests round-report files that remote game servers drop
//! into a pending directory, validates and authorizes each one, commits round
//! and player data to a PostgreSQL stats store, and moves the file to a
//! terminal processed or failed directory. Failures attributable to a known
//! server are recorded for operator review.
//!
//! ## Design Overview
//! - **Decoding**: Classifies JSON decode faults into a fixed diagnostic
//!   taxonomy via the `decode` module (including legacy-format detection).
//! - **Parsing**: Extracts server identity, map metadata, and the player list
//!   into a `Snapshot` via the `report` module.
//! - **Authorization**: Resolves the reporting server against the stats store
//!   via the `authorize` module, with a configurable unknown-server policy.
//! - **Processing**: Orchestrates idempotency detection, persistence, and
//!   failure recording via the `pipeline` module.
//! - **Lifecycle**: Moves files between the pending/processed/failed
//!   directories via the `lifecycle` module.
//!
//! ## Usage
//! 1. Ensure a PostgreSQL database is running and reachable.
//! 2. Configure through CLI arguments or environment variables:
//!    ```sh
//!    export SNAPSHOT_DIR=/srv/snapshots
//!    export DB_PARAMS="host=localhost user=postgres password=example dbname=round_stats"
//!    ```
//! 3. Run an action:
//!    ```sh
//!    cargo run -- list
//!    cargo run -- accept 2024-03-01-upload.json
//!    cargo run -- accept replanted.json --ignore-authorization
//!    cargo run -- delete old-1.json old-2.json
//!    cargo run -- failures
//!    cargo run -- delete-failure 17
//!    ```
//! 4. Logging levels are controlled by the `RUST_LOG` environment variable:
//!    ```sh
//!    export RUST_LOG=info
//!    ```

use clap::{Parser, Subcommand};
use log::info;
use round_snapshots::config::{PipelineConfig, UnknownServerPolicy};
use round_snapshots::pipeline::{
    accept_pending, delete_failed_record, delete_pending, list_failed_records, list_pending,
    FileLocks, Outcome,
};
use round_snapshots::store::PostgresStore;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line arguments for the round-snapshot pipeline.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Base directory holding the pending/processed/failed subdirectories.
    #[clap(long, env = "SNAPSHOT_DIR", default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// PostgreSQL connection string (e.g., "host=localhost user=postgres password=example dbname=round_stats").
    #[clap(long, env = "DB_PARAMS", default_value = "host=localhost user=postgres dbname=round_stats")]
    db_params: String,

    /// Policy for servers that have never reported before.
    #[clap(long, env = "UNKNOWN_SERVERS", value_enum, default_value = "register")]
    unknown_servers: UnknownServerPolicy,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List pending snapshots with display metadata.
    List,
    /// Accept a pending snapshot: process it and archive the file.
    Accept {
        /// Filename in the pending directory.
        filename: String,
        /// Bypass server authorization (operator-approved manual imports only).
        #[clap(long, action)]
        ignore_authorization: bool,
    },
    /// Delete pending snapshots without processing them.
    Delete {
        /// Filenames in the pending directory.
        #[clap(required = true)]
        filenames: Vec<String>,
    },
    /// List recorded processing failures, newest first.
    Failures,
    /// Delete a failure record and its file in the failed directory.
    DeleteFailure {
        /// Id of the failure record.
        id: i32,
    },
}

/// Dispatches one pipeline action.
///
/// Builds the configuration from arguments, connects to the stats store, and
/// runs the requested action. Every action resolves to a success/failure
/// outcome with a message; a failure outcome becomes a non-zero exit code.
#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = PipelineConfig::from_base_dir(&args.snapshot_dir, args.unknown_servers);
    config.ensure_directories()?;
    info!("Using snapshot directory: {}", args.snapshot_dir.display());

    let store = PostgresStore::connect(&args.db_params).await?;
    let locks = FileLocks::new();

    match args.command {
        Command::List => {
            let rows = list_pending(&config)?;
            println!("{} pending snapshot(s)", rows.len());
            for row in rows {
                println!(
                    "{}  {}  {}  {}:{}  {} player(s)  ended {}",
                    row.filename,
                    row.server_name,
                    row.map_name,
                    row.server_ip,
                    row.game_port,
                    row.player_count,
                    row.ended_at
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Accept {
            filename,
            ignore_authorization,
        } => {
            let outcome =
                accept_pending(&store, &config, &locks, &filename, ignore_authorization).await;
            report(outcome)
        }
        Command::Delete { filenames } => {
            let outcome = delete_pending(&config, &locks, &filenames).await;
            report(outcome)
        }
        Command::Failures => {
            let records = list_failed_records(&store).await?;
            println!("{} failure record(s)", records.len());
            for record in records {
                println!(
                    "#{}  server {}  at {}  {}  {}",
                    record.id,
                    record
                        .server_id
                        .map_or_else(|| "-".to_string(), |id| id.to_string()),
                    record.failed_at,
                    record.filename,
                    record.reason
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::DeleteFailure { id } => {
            let outcome = delete_failed_record(&store, &config, id).await;
            report(outcome)
        }
    }
}

/// Prints an action outcome and maps it to an exit code.
fn report(outcome: Outcome) -> Result<ExitCode, Box<dyn Error>> {
    println!("{}", outcome.message);
    if outcome.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
