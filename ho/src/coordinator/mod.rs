//! Task/observer coordination across independent attach/detach cycles
//!
//! A [`TaskCoordinator`] is one "slot" of asynchronous work that a retained
//! container keeps alive across recreation of the observing side. The task
//! side and the observer side each come and go on their own schedule:
//!
//! ```text
//!   connect(op) ──────────────► CachedTask (runs to completion, cached)
//!                                   │
//!        keep-alive watcher ◄───────┤ (witnesses the outcome with
//!                                   │  zero external observers)
//!   subscribe(factory) ─► observer ◄┘ (fresh instance per attach;
//!                                      buffered outcome replayed)
//! ```
//!
//! States: `Idle` (no task, no observer), `ConnectedOnly`, `SubscribedOnly`,
//! `Active`. Task termination returns the coordinator to `Idle` whether or
//! not anyone was watching; an unwitnessed outcome stays buffered in the
//! cached task and is replayed to the next subscriber.

mod core;
mod error;
mod observer;

pub use self::core::{Connection, Subscription, TaskCoordinator};
pub use error::CoordinatorError;
pub use observer::{FnObserver, Observer, ObserverFactory};
