use chrono::Utc;
use tokio::sync::mpsc;

use super::{BatchEvent, EventEnvelope};

/// Handle for emitting batch events
///
/// Cheaply cloneable. Events go through a channel to the `EventWriter`.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventHandle {
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity.
    ///
    /// A closed channel is logged; the caller is never failed.
    pub async fn emit(&self, event: BatchEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit batch event: {}", e);
        }
    }
}
