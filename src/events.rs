//! Initialization lifecycle events.
//!
//! The [`Initializer`](crate::Initializer) emits one event after each step
//! via [`EventBus::emit`]; observers subscribe via [`EventBus::subscribe`].
//! Built on [`tokio::sync::broadcast`] so multiple listeners can react
//! independently.

use tokio::sync::broadcast;

/// Events that flow through the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A module was bound into the API. `replaced` is true when it
    /// displaced an earlier binding.
    ModuleBound { exports: Vec<String>, replaced: bool },
    /// The caller's backend was wrapped for the engine.
    StorageWrapped,
    /// The engine entry point returned a handle.
    EngineOpened { entry_point: String },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(Event::EngineOpened {
            entry_point: "open_mix_f32_f32".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            Event::EngineOpened {
                entry_point: "open_mix_f32_f32".to_string()
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(Event::StorageWrapped);

        assert_eq!(rx1.recv().await.unwrap(), Event::StorageWrapped);
        assert_eq!(rx2.recv().await.unwrap(), Event::StorageWrapped);
    }

    #[test]
    fn emit_without_subscribers_returns_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.emit(Event::StorageWrapped), 0);
    }

    #[test]
    fn emit_with_subscriber_returns_count() {
        let bus = EventBus::default();
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();

        let count = bus.emit(Event::ModuleBound {
            exports: vec![],
            replaced: false,
        });
        assert_eq!(count, 2);
    }
}
