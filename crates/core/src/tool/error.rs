//! Error types for the tool module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::ToolOperation;

/// Errors that can occur while invoking an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool executable not found.
    #[error("Tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// Tool ran and reported failure.
    #[error("{operation} failed {}{}", exit_status(.code), stderr_tail(.stderr))]
    Failed {
        operation: ToolOperation,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// Tool did not finish in time.
    #[error("Tool timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while running the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Creates a failed-run error, dropping empty stderr.
    pub fn failed(operation: ToolOperation, code: Option<i32>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self::Failed {
            operation,
            code,
            stderr: if stderr.trim().is_empty() {
                None
            } else {
                Some(stderr)
            },
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("with exit code {}", code),
        None => "without an exit code (killed by a signal)".to_string(),
    }
}

/// Last non-blank stderr line, which is where the toolkit puts its reason.
fn stderr_tail(stderr: &Option<String>) -> String {
    stderr
        .as_deref()
        .and_then(|text| text.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .map(|line| format!(": {}", line))
        .unwrap_or_default()
}
