//! The `EventBus` trait and an in-memory implementation for tests and the
//! CLI's dry-run mode.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::event_types::WorkflowEvent;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// Publish/subscribe interface over workflow events. Implementations need
/// not guarantee exactly-once delivery — subscribers must be idempotent,
/// keyed off `(step_id, event_type)` or similar.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: &WorkflowEvent) -> Result<(), EventBusError>;

    /// Subscribe to all events. Returns a receiver; lagging subscribers may
    /// miss events (see `tokio::sync::broadcast::error::RecvError::Lagged`
    /// for the in-memory bus, or a redelivered-then-dropped message for
    /// JetStream).
    async fn subscribe(&self) -> Result<broadcast::Receiver<WorkflowEvent>, EventBusError>;
}

/// An in-process event bus backed by a `tokio::sync::broadcast` channel.
/// Used by tests and the operator CLI, which don't need durability across
/// process restarts.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: &WorkflowEvent) -> Result<(), EventBusError> {
        // No active subscribers is not an error: nothing is listening yet.
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<broadcast::Receiver<WorkflowEvent>, EventBusError> {
        Ok(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanopore_domain::SampleId;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = InMemoryEventBus::default();
        let mut rx = bus.subscribe().await.unwrap();

        let event = WorkflowEvent::SampleUpdated {
            sample_id: SampleId::new(),
            updated_at: chrono::Utc::now(),
        };
        bus.publish(&event).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), event.event_type());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = InMemoryEventBus::default();
        let event = WorkflowEvent::SampleUpdated {
            sample_id: SampleId::new(),
            updated_at: chrono::Utc::now(),
        };
        assert!(bus.publish(&event).await.is_ok());
    }
}
