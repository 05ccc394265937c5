//! Event Bus - explicit pub/sub channel for coordinator lifecycle events
//!
//! Built on tokio broadcast channels: coordinators emit through per-slot
//! [`EventEmitter`]s, consumers (loggers, dashboards, tests) subscribe.
//! There is deliberately no global instance - the bus is constructed by the
//! application and injected wherever events should flow.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::HoEvent;

/// Default channel capacity (events)
///
/// Coordinator lifecycle events are low-rate (a handful per task); this
/// covers bursts of many short-lived tasks without dropping.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for coordinator lifecycle events
pub struct EventBus {
    tx: broadcast::Sender<HoEvent>,
    channel_capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            channel_capacity: capacity,
        }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// The capacity this bus was created with
    pub fn capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped; if the
    /// channel is full, the oldest events are dropped.
    pub fn emit(&self, event: HoEvent) {
        debug!(event_type = event.event_type(), slot = event.slot(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<HoEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle bound to a specific slot
    pub fn emitter_for(&self, slot: impl Into<String>) -> EventEmitter {
        let slot = slot.into();
        debug!(%slot, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            slot,
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for a coordinator slot to emit events without owning the bus
///
/// Cheap to clone; every event it emits carries the bound slot name.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<HoEvent>,
    slot: String,
}

impl EventEmitter {
    /// The slot this emitter is bound to
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Emit a raw event
    pub fn emit(&self, event: HoEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    /// Emit a task connected event
    pub fn task_connected(&self, task_id: &str) {
        self.emit(HoEvent::TaskConnected {
            slot: self.slot.clone(),
            task_id: task_id.to_string(),
        });
    }

    /// Emit a task finished event
    pub fn task_finished(&self, task_id: &str, kind: &str) {
        self.emit(HoEvent::TaskFinished {
            slot: self.slot.clone(),
            task_id: task_id.to_string(),
            kind: kind.to_string(),
        });
    }

    /// Emit an observer attached event
    pub fn observer_attached(&self) {
        self.emit(HoEvent::ObserverAttached {
            slot: self.slot.clone(),
        });
    }

    /// Emit an observer detached event
    pub fn observer_detached(&self) {
        self.emit(HoEvent::ObserverDetached {
            slot: self.slot.clone(),
        });
    }

    /// Emit an outcome delivered event
    pub fn outcome_delivered(&self, task_id: &str, kind: &str, replayed: bool) {
        self.emit(HoEvent::OutcomeDelivered {
            slot: self.slot.clone(),
            task_id: task_id.to_string(),
            kind: kind.to_string(),
            replayed,
        });
    }

    /// Emit a slot destroyed event
    pub fn slot_destroyed(&self) {
        self.emit(HoEvent::SlotDestroyed {
            slot: self.slot.clone(),
        });
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}
