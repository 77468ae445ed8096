//! Mock tool adapter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::tool::{ToolAdapter, ToolError, ToolInvocation, ToolOperation, ToolOutput};

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// The invocation that was submitted.
    pub invocation: ToolInvocation,
    /// Whether the invocation succeeded.
    pub success: bool,
}

/// Mock implementation of the ToolAdapter trait.
///
/// Provides controllable behavior for testing:
/// - Track invocations for assertions
/// - Fail a given operation for a given unit
/// - Simulate tool run time and measure peak concurrency
/// - Optionally create the files the real tools would write
///
/// # Example
///
/// ```rust,ignore
/// use wavpipe_core::testing::MockToolAdapter;
///
/// let adapter = MockToolAdapter::new();
/// adapter.fail_for("1843", ToolOperation::Reprocess).await;
///
/// // Run the pipeline...
///
/// let calls = adapter.invocations_for("1843").await;
/// assert_eq!(calls.len(), 2);
/// ```
#[derive(Debug)]
pub struct MockToolAdapter {
    /// Recorded invocations.
    invocations: Arc<RwLock<Vec<RecordedInvocation>>>,
    /// Operations that fail for a unit.
    failures: Arc<RwLock<HashSet<(String, ToolOperation)>>>,
    /// Units whose tool calls panic.
    panics: Arc<RwLock<HashSet<String>>>,
    /// Log returned per operation.
    logs: Arc<RwLock<HashMap<ToolOperation, String>>>,
    /// Simulated run time in milliseconds.
    duration_ms: Arc<RwLock<u64>>,
    /// Archive root under which tool outputs are simulated.
    archive_root: Arc<RwLock<Option<PathBuf>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Default for MockToolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolAdapter {
    /// Create a new mock adapter. All operations succeed with an empty log.
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashSet::new())),
            panics: Arc::new(RwLock::new(HashSet::new())),
            logs: Arc::new(RwLock::new(HashMap::new())),
            duration_ms: Arc::new(RwLock::new(0)),
            archive_root: Arc::new(RwLock::new(None)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get all recorded invocations.
    pub async fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.read().await.clone()
    }

    /// Recorded invocations for one unit, in call order.
    pub async fn invocations_for(&self, unit: &str) -> Vec<RecordedInvocation> {
        self.invocations
            .read()
            .await
            .iter()
            .filter(|r| r.invocation.unit_id == unit)
            .cloned()
            .collect()
    }

    /// Operations invoked for one unit, in call order.
    pub async fn operations_for(&self, unit: &str) -> Vec<ToolOperation> {
        self.invocations_for(unit)
            .await
            .into_iter()
            .map(|r| r.invocation.operation)
            .collect()
    }

    /// Clear recorded invocations.
    pub async fn clear_recorded(&self) {
        self.invocations.write().await.clear();
    }

    /// Make `operation` fail for `unit`.
    pub async fn fail_for(&self, unit: &str, operation: ToolOperation) {
        self.failures
            .write()
            .await
            .insert((unit.to_string(), operation));
    }

    /// Make every tool call for `unit` panic.
    pub async fn panic_for(&self, unit: &str) {
        self.panics.write().await.insert(unit.to_string());
    }

    /// Set the log returned by `operation`.
    pub async fn set_log(&self, operation: ToolOperation, log: &str) {
        self.logs.write().await.insert(operation, log.to_string());
    }

    /// Set the simulated run time of every invocation.
    pub async fn set_duration(&self, duration: Duration) {
        *self.duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Write the files the real tools would produce under `root`.
    pub async fn simulate_outputs(&self, root: &Path) {
        *self.archive_root.write().await = Some(root.to_path_buf());
    }

    /// Highest number of invocations that were running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn write_outputs(&self, invocation: &ToolInvocation) -> std::io::Result<()> {
        let Some(root) = self.archive_root.read().await.clone() else {
            return Ok(());
        };
        let unit = &invocation.unit_id;
        let unit_dir = root.join(unit);

        match invocation.operation {
            ToolOperation::Download => {
                std::fs::create_dir_all(unit_dir.join("primary"))?;
                std::fs::create_dir_all(unit_dir.join("secondary"))?;
            }
            ToolOperation::Reprocess => {
                let repro = unit_dir.join("repro");
                std::fs::create_dir_all(&repro)?;
                std::fs::write(repro.join(format!("acisf{}_repro_evt2.fits", unit)), b"")?;
                std::fs::write(repro.join(format!("hrcf{}_repro_evt2.fits", unit)), b"")?;
            }
            ToolOperation::FluxImage => {
                if let (Some(outroot), Some(band)) =
                    (invocation.get("outroot"), invocation.get("bands"))
                {
                    for suffix in ["img", "expmap", "psfmap"] {
                        let path = PathBuf::from(format!("{}_{}_thresh.{}", outroot, band, suffix));
                        if let Some(parent) = path.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(path, b"")?;
                    }
                }
            }
            ToolOperation::WavDetect => {
                if let Some(outfile) = invocation.get("outfile") {
                    let path = PathBuf::from(outfile);
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, b"")?;
                }
            }
        }
        Ok(())
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        if self.panics.read().await.contains(&invocation.unit_id) {
            panic!("simulated tool crash for {}", invocation.unit_id);
        }

        let duration_ms = *self.duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let key = (invocation.unit_id.clone(), invocation.operation);
        if self.failures.read().await.contains(&key) {
            return Err(ToolError::failed(
                invocation.operation,
                Some(1),
                format!("simulated failure for {}", invocation.unit_id),
            ));
        }

        self.write_outputs(invocation).await?;

        let log = self
            .logs
            .read()
            .await
            .get(&invocation.operation)
            .cloned()
            .unwrap_or_default();
        Ok(ToolOutput::new(log))
    }
}

#[async_trait]
impl ToolAdapter for MockToolAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = self.run(&invocation).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.invocations.write().await.push(RecordedInvocation {
            invocation,
            success: result.is_ok(),
        });
        result
    }

    async fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }
}
