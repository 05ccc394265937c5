//! Typed lifecycle event channel
//!
//! There is no process-global bus and no implicit register/unregister: the
//! channel is explicit and typed. Whoever wants events constructs an
//! [`EventBus`], hands per-slot [`EventEmitter`]s to the coordinators, and
//! subscribes consumers (loggers, dashboards, tests) to the broadcast side.
//!
//! ```text
//!  TaskCoordinator("save") ── emitter ──┐
//!  TaskCoordinator("list") ── emitter ──┤──► EventBus ──► subscribers
//!  TaskHost teardown ──────── emitter ──┘    (broadcast)   (logger, ...)
//! ```
//!
//! Emission is fire-and-forget: with no subscribers an event is dropped, a
//! full channel drops the oldest events. A coordinator built without an
//! emitter emits nothing.

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use logger::{EventLogger, read_slot_events, spawn_event_logger};
pub use types::{EventLogEntry, HoEvent};
