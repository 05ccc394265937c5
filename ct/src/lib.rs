//! CachedTask - one-shot async operations with cached terminal outcomes
//!
//! A [`CachedTask`] converts a one-shot async computation into a multicast
//! source: the computation runs exactly once, its terminal [`Outcome`] is
//! retained, and any number of subscribers receive that outcome - whether
//! they subscribe before or after the computation finishes.
//!
//! This is the primitive that lets an in-flight operation outlive whoever
//! started it: the driver task is detached, so dropping every handle stops
//! nobody from finishing the work. Cancellation of a handle means "stop
//! listening", never "stop working".
//!
//! # Example
//!
//! ```rust,ignore
//! use cachedtask::{CachedTask, Outcome};
//!
//! let task = CachedTask::spawn(async {
//!     // some slow computation
//!     Outcome::Value(42u32)
//! });
//!
//! // Late subscribers still see the outcome
//! assert_eq!(task.outcome().await, Outcome::Value(42));
//! assert_eq!(task.outcome().await, Outcome::Value(42));
//! ```

mod cached;
mod error;
mod outcome;

pub use cached::{CachedTask, TaskId};
pub use error::TaskError;
pub use outcome::Outcome;
