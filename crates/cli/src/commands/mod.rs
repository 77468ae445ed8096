//! Commands module
//!
//! Defines the CLI commands and their handlers.

mod merge;
mod run;

pub use merge::MergeArgs;
pub use run::RunArgs;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;

use wavpipe_core::{load_config_or_default, Config};

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline over every unit in a list
    Run(RunArgs),
    /// Merge per-pair transform records into one table
    Merge(MergeArgs),
}

/// The command cannot run as invoked; nothing was processed.
#[derive(Debug, thiserror::Error)]
#[error("{0:#}")]
pub struct UsageError(anyhow::Error);

/// Marks an error as an invalid invocation.
pub fn usage(e: impl Into<anyhow::Error>) -> anyhow::Error {
    anyhow::Error::new(UsageError(e.into()))
}

/// Routes the command to its handler.
pub async fn handle_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let config = load_config_or_default(config_path).map_err(usage)?;
    match command {
        Commands::Run(args) => run::handle_run(args, config).await,
        Commands::Merge(args) => merge::handle_merge(args, config),
    }
}

/// Resolves `path` against `base` unless it is already absolute.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Short fingerprint of the effective configuration.
pub fn config_hash(config: &Config) -> String {
    use sha2::{Digest, Sha256};

    let config_json = serde_json::to_string(config).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    hash[..16].to_string()
}
