use std::sync::Arc;

use tokio::sync::mpsc;

use super::{EventEnvelope, EventHandle, EventSink};

/// Background task that fans events out to sinks
pub struct EventWriter {
    rx: mpsc::Receiver<EventEnvelope>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventWriter {
    pub fn new(rx: mpsc::Receiver<EventEnvelope>, sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { rx, sinks }
    }

    /// Run the writer until every handle has been dropped.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::debug!("Event writer started");

        while let Some(envelope) = self.rx.recv().await {
            for sink in &self.sinks {
                if let Err(e) = sink.write(&envelope) {
                    tracing::error!(
                        "Failed to write {} event: {}",
                        envelope.event.event_type(),
                        e
                    );
                }
            }
        }

        tracing::debug!("Event writer shutting down");
    }
}

/// Create a complete event system
///
/// Returns:
/// - `EventHandle` - for emitting events (clone this to share across tasks)
/// - `EventWriter` - spawn this as a background task with `tokio::spawn(writer.run())`
pub fn create_event_system(
    sinks: Vec<Arc<dyn EventSink>>,
    buffer_size: usize,
) -> (EventHandle, EventWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EventHandle::new(tx), EventWriter::new(rx, sinks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BatchEvent, EventError, MemorySink};

    struct FailingSink;

    impl EventSink for FailingSink {
        fn write(&self, _envelope: &EventEnvelope) -> Result<(), EventError> {
            Err(EventError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn test_writer_delivers_in_order() {
        let sink = MemorySink::new();
        let (handle, writer) = create_event_system(vec![Arc::new(sink.clone())], 10);
        let writer_handle = tokio::spawn(writer.run());

        for unit in ["a", "b", "c"] {
            handle
                .emit(BatchEvent::UnitStarted {
                    unit: unit.to_string(),
                })
                .await;
        }
        drop(handle);
        writer_handle.await.unwrap();

        let units: Vec<_> = sink
            .events()
            .iter()
            .filter_map(|e| e.unit().map(String::from))
            .collect();
        assert_eq!(units, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_starve_others() {
        let sink = MemorySink::new();
        let (handle, writer) =
            create_event_system(vec![Arc::new(FailingSink), Arc::new(sink.clone())], 10);
        let writer_handle = tokio::spawn(writer.run());

        handle
            .emit(BatchEvent::UnitStarted {
                unit: "1843".to_string(),
            })
            .await;
        drop(handle);
        writer_handle.await.unwrap();

        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_writer_waits_for_all_handles() {
        let (handle, writer) = create_event_system(vec![], 10);
        let other = handle.clone();
        let writer_handle = tokio::spawn(writer.run());

        drop(handle);
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert!(!writer_handle.is_finished());

        drop(other);
        let result =
            tokio::time::timeout(tokio::time::Duration::from_secs(1), writer_handle).await;
        assert!(result.is_ok());
    }
}
