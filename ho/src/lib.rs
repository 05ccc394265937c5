//! Holdover - lifecycle-aware coordination of one-shot async tasks
//!
//! Holdover binds a single in-flight async operation to a single observer
//! whose attachment is controlled by an external lifecycle (a screen, a
//! session, a tab) that can detach and reattach at any time. The operation's
//! lifetime and the observer's lifetime are independent:
//!
//! - **Recreation never restarts work**: the operation keeps running while
//!   the observing side is torn down and rebuilt.
//! - **At most one operation per slot**: connecting twice is a caller bug and
//!   fails loudly.
//! - **Outcomes are never lost**: a terminal outcome arriving while nobody is
//!   attached is buffered and replayed to the next observer, exactly once.
//!
//! # Core Concepts
//!
//! - **Connect**: hand an async operation to a [`TaskCoordinator`]; it is
//!   wrapped in a cached/replayable task and kept warm by an internal
//!   keep-alive watcher even with zero observers.
//! - **Subscribe**: register an observer *factory* (observers are single-use,
//!   so a fresh instance is built on every attach).
//! - **Cancel = stop listening**: cancelling either guard never aborts the
//!   underlying operation.
//!
//! # Modules
//!
//! - [`coordinator`] - the [`TaskCoordinator`] state machine and guards
//! - [`host`] - retained registry of named coordinator slots
//! - [`events`] - typed lifecycle event channel and JSONL event logger
//! - [`retry`] - exponential backoff decorator applied before `connect`
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface for the sample driver

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod host;
pub mod retry;

// Re-export the task primitives alongside the coordinator API
pub use cachedtask::{CachedTask, Outcome, TaskError, TaskId};

pub use config::{Config, EventsConfig};
pub use coordinator::{Connection, CoordinatorError, FnObserver, Observer, Subscription, TaskCoordinator};
pub use events::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, EventLogEntry, EventLogger, HoEvent, create_event_bus,
    read_slot_events, spawn_event_logger,
};
pub use host::{HostError, TaskHost};
pub use retry::{Backoff, with_backoff};
