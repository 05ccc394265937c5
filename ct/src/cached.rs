//! Cached, replayable one-shot tasks
//!
//! [`CachedTask`] runs a future exactly once on the tokio runtime and retains
//! its terminal [`Outcome`] in a watch channel. Handles are cheap clones of
//! the receiving side; each call to [`CachedTask::outcome`] resolves with a
//! clone of the retained outcome, immediately if the task already finished.
//!
//! The driver task is detached: there is no abort API, and dropping every
//! handle does not stop the computation. This is deliberate - the whole point
//! of caching is that work triggered by a now-gone observer still completes.

use std::future::Future;

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::error::TaskError;
use crate::outcome::Outcome;

/// Identifier assigned to each spawned task (uuid v7, time-ordered)
pub type TaskId = String;

/// A one-shot async operation with a cached, multicast terminal outcome
///
/// Cloning a `CachedTask` produces another handle onto the same underlying
/// computation; the computation itself never runs twice.
#[derive(Clone)]
pub struct CachedTask<T> {
    id: TaskId,
    rx: watch::Receiver<Option<Outcome<T>>>,
}

impl<T> CachedTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawn a future as a cached task
    ///
    /// The future starts immediately on the current tokio runtime. Must be
    /// called from within a runtime context.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Outcome<T>> + Send + 'static,
    {
        let id = Uuid::now_v7().to_string();
        let (tx, rx) = watch::channel(None);
        debug!(task_id = %id, "CachedTask::spawn: starting driver");

        let driver_id = id.clone();
        tokio::spawn(async move {
            let outcome = fut.await;
            debug!(task_id = %driver_id, kind = outcome.kind(), "CachedTask driver: publishing terminal outcome");
            // send_replace stores the outcome even if no receiver is
            // currently listening; late subscribers read it from the channel
            tx.send_replace(Some(outcome));
        });

        Self { id, rx }
    }

    /// Create an already-terminated task holding `outcome`
    pub fn ready(outcome: Outcome<T>) -> Self {
        let id = Uuid::now_v7().to_string();
        let (tx, rx) = watch::channel(Some(outcome));
        debug!(task_id = %id, "CachedTask::ready: pre-terminated task");
        drop(tx);
        Self { id, rx }
    }

    /// Wait for the terminal outcome
    ///
    /// Resolves immediately if the task has already terminated. Every caller
    /// receives its own clone of the outcome. If the driver is lost before
    /// publishing (a panic in the wrapped future, or runtime teardown), this
    /// resolves with [`Outcome::Error`] rather than hanging.
    pub async fn outcome(&self) -> Outcome<T> {
        let mut rx = self.rx.clone();
        loop {
            {
                let current = rx.borrow_and_update();
                if let Some(outcome) = current.as_ref() {
                    return outcome.clone();
                }
            }
            if rx.changed().await.is_err() {
                // Sender gone; either the outcome landed just before the
                // drop, or the driver died without publishing one.
                let current = rx.borrow();
                return match current.as_ref() {
                    Some(outcome) => outcome.clone(),
                    None => Outcome::Error(TaskError::new("task dropped before producing an outcome")),
                };
            }
        }
    }

    /// Snapshot of the terminal outcome, if any. Side-effect free.
    pub fn peek(&self) -> Option<Outcome<T>> {
        self.rx.borrow().clone()
    }

    /// This task's identifier
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> CachedTask<T> {
    /// True once the task has published its terminal outcome
    pub fn is_terminated(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

impl<T> std::fmt::Debug for CachedTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTask")
            .field("id", &self.id)
            .field("terminated", &self.rx.borrow().is_some())
            .finish()
    }
}
