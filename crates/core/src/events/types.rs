use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::unit::UnitOutcome;

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        batch_id: String,
        units: usize,
        concurrency: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config_hash: Option<String>,
    },
    UnitStarted {
        unit: String,
    },
    UnitFinished {
        unit: String,
        outcome: UnitOutcome,
        elapsed_secs: f64,
    },
    BatchFinished {
        batch_id: String,
        succeeded: usize,
        rejected: usize,
        failed: usize,
        not_started: usize,
    },
}

impl BatchEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BatchStarted { .. } => "batch_started",
            Self::UnitStarted { .. } => "unit_started",
            Self::UnitFinished { .. } => "unit_finished",
            Self::BatchFinished { .. } => "batch_finished",
        }
    }

    /// The unit this event is about, if any.
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::UnitStarted { unit } | Self::UnitFinished { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

/// Envelope wrapping an event with its emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BatchEvent,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::RejectionReason;

    #[test]
    fn test_event_type_matches_serde_tag() {
        let event = BatchEvent::UnitFinished {
            unit: "1843".to_string(),
            outcome: UnitOutcome::Rejected(RejectionReason::ReadoutMode),
            elapsed_secs: 1.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["outcome"]["status"], "rejected");
        assert_eq!(event.unit(), Some("1843"));
    }

    #[test]
    fn test_envelope_flattens_event() {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event: BatchEvent::UnitStarted {
                unit: "1843".to_string(),
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "unit_started");
        assert_eq!(json["unit"], "1843");
        assert!(json["timestamp"].is_string());

        let parsed: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.event, envelope.event);
    }

    #[test]
    fn test_batch_started_omits_missing_hash() {
        let event = BatchEvent::BatchStarted {
            batch_id: "b".to_string(),
            units: 2,
            concurrency: 1,
            config_hash: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("config_hash"));
        assert_eq!(event.unit(), None);
    }
}
