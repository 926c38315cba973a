//! atomlog CLI — write, read, and list log records on a conditional log store.
//!
//! ```text
//! atomlog --storage local:///tmp/tbl --atomic-writes write _log/00000.json < actions.jsonl
//! atomlog --config store.json read _log/00000.json
//! atomlog --config store.json list _log/00000.json
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use atomlog_core::{LogStore, LogStoreConfig, LogStoreError};
use atomlog_storage::open_log_store;

/// Exit status when an exclusive write loses to an existing record.
const EXIT_ALREADY_EXISTS: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "atomlog", version, about = "Conditional log store over object storage")]
struct Cli {
    /// JSON file holding a store configuration; flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage URI (`local://<path>`, `memory://`, `s3://bucket/prefix`).
    #[arg(long)]
    storage: Option<String>,

    /// Assert that the backing store is configured for atomic writes.
    #[arg(long)]
    atomic_writes: bool,

    /// Override the store's precondition-failure marker.
    #[arg(long)]
    precondition_marker: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write lines from stdin (or --input) as a new log record.
    Write {
        key: String,
        /// Replace the record if it already exists.
        #[arg(long)]
        overwrite: bool,
        /// Read actions from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print a log record's lines.
    Read { key: String },
    /// List records in the same directory at or after KEY.
    List { key: String },
}

fn load_config(cli: &Cli) -> Result<LogStoreConfig, LogStoreError> {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path)?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                LogStoreError::config(format!("Invalid config {}: {e}", path.display()))
            })?
        }
        None => {
            let storage = cli.storage.clone().ok_or_else(|| {
                LogStoreError::config("either --config or --storage is required")
            })?;
            LogStoreConfig::new(storage)
        }
    };
    if let Some(storage) = &cli.storage {
        config.storage_uri = storage.clone();
    }
    if cli.atomic_writes {
        config.atomic_writes = Some(true);
    }
    if let Some(marker) = &cli.precondition_marker {
        config.precondition_marker = marker.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), LogStoreError> {
    let config = load_config(&cli)?;
    let store = open_log_store(&config)?;

    match cli.command {
        Command::Write {
            key,
            overwrite,
            input,
        } => {
            let reader: Box<dyn BufRead> = match input {
                Some(path) => Box::new(BufReader::new(File::open(path)?)),
                None => Box::new(io::stdin().lock()),
            };
            let actions = reader.lines().collect::<io::Result<Vec<String>>>()?;
            let written = store.write_lines(&key, actions, overwrite)?;
            println!("Wrote {written} bytes to {key}");
        }
        Command::Read { key } => {
            for line in store.read(&key)? {
                println!("{line}");
            }
        }
        Command::List { key } => {
            for found in store.list_from(&key)? {
                println!("{found}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ LogStoreError::AlreadyExists { .. }) => {
            error!("{e}");
            ExitCode::from(EXIT_ALREADY_EXISTS)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
