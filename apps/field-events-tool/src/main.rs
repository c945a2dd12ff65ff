//! CLI tool for inspecting change sets.
//!
//! Provides commands for:
//! - Diffing two JSON snapshots for a lifecycle phase
//! - Listing the handler names a change set resolves to

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use field_events_core::{
    ChangeDispatcher, ChangeSet, DispatchConfig, DispatchError, Phase, Snapshot,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dispatcher configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diff two snapshots and report changes with their handler names
    Diff {
        /// Snapshot before the mutation; may be omitted for after-insert
        #[arg(long)]
        old: Option<PathBuf>,

        /// Snapshot after the mutation
        #[arg(long)]
        new: PathBuf,

        /// Lifecycle phase (before-update, after-update, after-insert)
        #[arg(long, default_value = "after-update")]
        phase: Phase,
    },
    /// Print the handler name for a field in every phase
    Names {
        /// Field name
        field: String,
    },
}

#[derive(Serialize, Debug)]
struct DiffReport {
    phase: Phase,
    changes: ChangeSet,
    handlers: Vec<String>,
}

fn read_snapshot(path: &Path, which: &'static str) -> anyhow::Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} snapshot {}", which, path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(Snapshot::from_json(value, which)?)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DispatchConfig> {
    let mut config = match path {
        Some(path) => DispatchConfig::from_file(path)?,
        None => DispatchConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn diff(
    config: DispatchConfig,
    old: Option<&Path>,
    new: &Path,
    phase: Phase,
) -> anyhow::Result<DiffReport> {
    let dispatcher: ChangeDispatcher<()> =
        ChangeDispatcher::with_registry(Default::default(), config);

    let old = match (old, phase) {
        (Some(path), _) => read_snapshot(path, "old")?,
        (None, Phase::AfterInsert) => Snapshot::new(),
        (None, _) => {
            return Err(DispatchError::InvalidSnapshot {
                which: "old",
                reason: "snapshot is absent".to_string(),
            }
            .into())
        }
    };
    let new = read_snapshot(new, "new")?;

    let changes = dispatcher.changes_for(phase, &old, &new);
    tracing::debug!("{} field(s) changed for {}", changes.len(), phase);

    let handlers = changes
        .fields()
        .map(|field| phase.handler_name(field))
        .collect();
    Ok(DiffReport {
        phase,
        changes,
        handlers,
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Diff { old, new, phase } => {
            let report = diff(config, old.as_deref(), &new, phase)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Names { field } => {
            for phase in Phase::ALL {
                println!("{}\t{}", phase, phase.handler_name(&field));
            }
        }
    }

    Ok(())
}
