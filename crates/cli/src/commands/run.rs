//! `wavpipe run`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tracing::{info, warn};

use wavpipe_core::events::{ConsoleSink, JsonLinesSink};
use wavpipe_core::{
    create_event_system, load_unit_list, validate_config, Config, EventSink, FsCompletionStore,
    FsInspector, ProcessToolAdapter, TaskRunner, ToolAdapter, UnitPipeline,
};

use super::{config_hash, resolve, usage};
use crate::metrics::encode_metrics;

/// Buffer size for the batch event channel
const EVENT_BUFFER_SIZE: usize = 1000;

#[derive(Args)]
pub struct RunArgs {
    /// File with one unit id per line (or comma-separated)
    pub unit_list: PathBuf,

    /// Archive root holding one directory per unit
    pub outdir: Option<PathBuf>,

    /// Units processed at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Detection edition label
    #[arg(long)]
    pub edition: Option<String>,

    /// Rerun detection even when this edition's source list exists
    #[arg(long)]
    pub no_skip_existing: bool,

    /// Batch report path (relative paths are under the archive root)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// JSON-lines event journal (relative paths are under the archive root)
    #[arg(long)]
    pub journal: Option<PathBuf>,

    /// Write Prometheus metrics here when the batch ends
    #[arg(long)]
    pub metrics: Option<PathBuf>,
}

impl RunArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(outdir) = &self.outdir {
            config.runner.archive_root = outdir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.runner.concurrency = concurrency;
        }
        if let Some(edition) = &self.edition {
            config.detection.edition = edition.clone();
        }
        if self.no_skip_existing {
            config.detection.skip_existing = false;
        }
        if let Some(report) = &self.report {
            config.runner.report_file = report.clone();
        }
        if let Some(journal) = &self.journal {
            config.runner.journal_file = Some(journal.clone());
        }
    }
}

pub async fn handle_run(args: RunArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);
    validate_config(&config).map_err(usage)?;

    let units = load_unit_list(&args.unit_list).map_err(usage)?;

    // Tools run with the archive root as working directory, so every path
    // handed to them must be absolute.
    let root = std::path::absolute(&config.runner.archive_root)
        .with_context(|| format!("Invalid archive root {:?}", config.runner.archive_root))
        .map_err(usage)?;
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create archive root {:?}", root))
        .map_err(usage)?;
    config.runner.archive_root = root.clone();

    info!(
        "Processing {} units under {:?} (concurrency {}, edition {})",
        units.len(),
        root,
        config.runner.concurrency,
        config.detection.edition
    );

    let adapter = ProcessToolAdapter::new(config.tool.clone(), root.clone());
    if let Err(e) = adapter.validate().await {
        warn!("Toolkit check failed, units will likely fail: {}", e);
    }

    let mut sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(ConsoleSink::stdout())];
    if let Some(journal) = &config.runner.journal_file {
        let path = resolve(&root, journal);
        let sink = JsonLinesSink::open(&path)
            .with_context(|| format!("Failed to open journal {:?}", path))
            .map_err(usage)?;
        info!("Journaling events to {:?}", path);
        sinks.push(Arc::new(sink));
    }
    let (event_handle, event_writer) = create_event_system(sinks, EVENT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(event_writer.run());

    let pipeline = UnitPipeline::new(
        &config,
        Arc::new(FsCompletionStore::new(&root)),
        Arc::new(adapter),
        Arc::new(FsInspector::new()),
    );
    let runner = Arc::new(
        TaskRunner::new(config.runner.concurrency, Arc::new(pipeline))
            .with_events(event_handle)
            .with_config_hash(config_hash(&config)),
    );

    let signal_task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            shutdown_signal().await;
            warn!("Interrupted, letting running units finish");
            runner.shutdown();
        })
    };

    let result = runner.submit(units).await;

    // The writer exits once every event handle is gone.
    signal_task.abort();
    let _ = signal_task.await;
    drop(runner);
    if let Err(e) = writer_handle.await {
        warn!("Event writer did not finish cleanly: {}", e);
    }

    let report = result.map_err(usage)?;

    let report_path = resolve(&root, &config.runner.report_file);
    report
        .write_json(&report_path)
        .with_context(|| format!("Failed to write report {:?}", report_path))?;
    info!("Report written to {:?}", report_path);

    if let Some(path) = &args.metrics {
        std::fs::write(path, encode_metrics())
            .with_context(|| format!("Failed to write metrics {:?}", path))?;
    }

    let counts = report.counts;
    println!(
        "{} units: {} succeeded, {} rejected, {} failed, {} not started",
        report.len(),
        counts.succeeded,
        counts.rejected,
        counts.failed,
        counts.not_started
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
