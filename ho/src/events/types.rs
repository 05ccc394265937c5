//! Event types for coordinator lifecycle observability

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle events emitted by coordinator slots
///
/// One variant per observable transition: tasks connecting and finishing,
/// observers attaching and detaching, outcomes being handed over, slots
/// being destroyed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HoEvent {
    /// A task was connected to a slot
    TaskConnected { slot: String, task_id: String },
    /// A connected task reached its terminal outcome
    TaskFinished {
        slot: String,
        task_id: String,
        /// Outcome variant label: "value", "empty", or "error"
        kind: String,
    },
    /// An observer factory was registered on a slot
    ObserverAttached { slot: String },
    /// The observer factory was cleared from a slot
    ObserverDetached { slot: String },
    /// A terminal outcome was handed to an observer
    OutcomeDelivered {
        slot: String,
        task_id: String,
        kind: String,
        /// True when the outcome was buffered and replayed on attach rather
        /// than delivered at termination
        replayed: bool,
    },
    /// The slot was permanently destroyed
    SlotDestroyed { slot: String },
}

impl HoEvent {
    /// Get the slot this event belongs to
    pub fn slot(&self) -> &str {
        match self {
            HoEvent::TaskConnected { slot, .. }
            | HoEvent::TaskFinished { slot, .. }
            | HoEvent::ObserverAttached { slot }
            | HoEvent::ObserverDetached { slot }
            | HoEvent::OutcomeDelivered { slot, .. }
            | HoEvent::SlotDestroyed { slot } => slot,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            HoEvent::TaskConnected { .. } => "TaskConnected",
            HoEvent::TaskFinished { .. } => "TaskFinished",
            HoEvent::ObserverAttached { .. } => "ObserverAttached",
            HoEvent::ObserverDetached { .. } => "ObserverDetached",
            HoEvent::OutcomeDelivered { .. } => "OutcomeDelivered",
            HoEvent::SlotDestroyed { .. } => "SlotDestroyed",
        }
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: HoEvent,
}

impl EventLogEntry {
    /// Create a new log entry with the current timestamp
    pub fn new(event: HoEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
