//! wavpipe command-line interface.

mod commands;
mod metrics;

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{handle_command, Commands, UsageError};

/// Exit code for a failure after the batch started.
const EXIT_FAILURE: i32 = 1;

/// Exit code for an invalid invocation.
const EXIT_USAGE: i32 = 2;

#[derive(Parser)]
#[command(name = "wavpipe", version)]
#[command(about = "Checkpointed batch pipeline for archive observations", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults are used when omitted.
    #[arg(long, global = true, env = "WAVPIPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the per-unit progress lines.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command, cli.config.as_deref()).await {
        error!("{:#}", e);
        let code = if e.downcast_ref::<UsageError>().is_some() {
            EXIT_USAGE
        } else {
            EXIT_FAILURE
        };
        std::process::exit(code);
    }
}
