//! Event bus distributing document events to the trigger dispatcher

use super::{DocumentEvent, EventEmitter};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus that distributes DocumentEvents via `tokio::sync::broadcast`
///
/// Fire-and-forget: emitting never blocks, never panics.
/// If no subscribers are connected, events are silently dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DocumentEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: DocumentEvent) {
        let path = event.path().to_string();
        let action = event.action();
        if let Ok(n) = self.sender.send(event) {
            debug!(path = %path, action, subscribers = n, "DocumentEvent emitted");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DocumentPath;
    use crate::test_helpers::test_project;

    #[test]
    fn test_emit_without_subscriber_no_panic() {
        let bus = EventBus::default();
        bus.emit_project_created(&test_project("user-1", 0));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_with_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let project = test_project("user-1", 2);
        bus.emit_project_created(&project);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.path(), &DocumentPath::project(project.id));
        assert_eq!(event.action(), "created");
    }

    #[test]
    fn test_multi_subscribers() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let project = test_project("user-1", 0);
        bus.emit_deleted(DocumentPath::project(project.id));

        assert_eq!(rx1.try_recv().unwrap().action(), "deleted");
        assert_eq!(rx2.try_recv().unwrap().action(), "deleted");
    }
}
