use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{BatchEvent, EventEnvelope, EventError};
use crate::unit::UnitOutcome;

/// Destination for batch events.
pub trait EventSink: Send + Sync {
    fn write(&self, envelope: &EventEnvelope) -> Result<(), EventError>;
}

/// Human-readable progress lines.
///
/// ```text
/// Started 1843
/// Finished 1843
/// 2000: rejected: wrong observing mode
/// ```
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn line(event: &BatchEvent) -> Option<String> {
        match event {
            BatchEvent::UnitStarted { unit } => Some(format!("Started {}", unit)),
            BatchEvent::UnitFinished {
                unit,
                outcome: UnitOutcome::Succeeded,
                ..
            } => Some(format!("Finished {}", unit)),
            BatchEvent::UnitFinished { unit, outcome, .. } => {
                Some(format!("{}: {}", unit, outcome))
            }
            _ => None,
        }
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn write(&self, envelope: &EventEnvelope) -> Result<(), EventError> {
        let Some(line) = Self::line(&envelope.event) else {
            return Ok(());
        };
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// Appends one JSON object per event to a journal file.
pub struct JsonLinesSink {
    file: Mutex<File>,
}

impl JsonLinesSink {
    pub fn open(path: &Path) -> Result<Self, EventError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for JsonLinesSink {
    fn write(&self, envelope: &EventEnvelope) -> Result<(), EventError> {
        let mut line = serde_json::to_string(envelope)?;
        line.push('\n');
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Keeps events in memory. Used by tests and by callers that inspect the
/// event stream after a run.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn write(&self, envelope: &EventEnvelope) -> Result<(), EventError> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(envelope.clone());
        Ok(())
    }
}
