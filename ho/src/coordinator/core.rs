//! TaskCoordinator - binds one in-flight task to one detachable observer

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use cachedtask::{CachedTask, Outcome};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::EventEmitter;

use super::error::CoordinatorError;
use super::observer::{Observer, ObserverFactory};

/// Shared coordinator state
///
/// All mutation happens under the one mutex. Observer callbacks run after
/// the guard is released; the factory runs under it, between consistent
/// states, so a panicking factory leaves the slot subscribed but with no
/// observer attached.
struct Inner<T> {
    /// Connected task; retained after an unwitnessed termination so the
    /// buffered outcome can be replayed to the next subscriber
    task: Option<CachedTask<T>>,
    /// Internal no-op-logging watcher that keeps witnessing the task while
    /// zero external observers are attached
    keep_alive: Option<JoinHandle<()>>,
    /// Completion tracker delivering the outcome to the attached observer
    tracker: Option<JoinHandle<()>>,
    /// Factory producing a fresh observer per attach
    factory: Option<ObserverFactory<T>>,
    /// Live observer instance awaiting the outcome
    observer: Option<Box<dyn Observer<T>>>,
    /// Bumped on every subscribe/detach; stale trackers and guards check it
    sub_epoch: u64,
    /// Bumped on every connect; stale connection guards check it
    conn_epoch: u64,
    destroyed: bool,
}

impl<T> Inner<T> {
    fn new() -> Self {
        Self {
            task: None,
            keep_alive: None,
            tracker: None,
            factory: None,
            observer: None,
            sub_epoch: 0,
            conn_epoch: 0,
            destroyed: false,
        }
    }

    fn running(&self) -> bool {
        matches!(&self.task, Some(task) if !task.is_terminated())
    }
}

fn lock_inner<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates one slot of asynchronous work across attach/detach cycles
///
/// The coordinator decouples the lifetime of an async operation from the
/// lifetime of whoever wants its outcome:
///
/// - [`connect`](Self::connect) wraps an operation in a [`CachedTask`] and
///   keeps it warm with an internal keep-alive watcher,
/// - [`subscribe`](Self::subscribe) registers an observer factory; a fresh
///   observer is built per attach and receives the terminal outcome exactly
///   once, whether it attaches before or after termination,
/// - [`on_destroy`](Self::on_destroy) tears the slot down for good.
///
/// Cloning yields another handle onto the same slot. All methods are
/// synchronous, non-blocking state mutations; the operation itself runs on
/// the tokio runtime and delivery happens on an internal watcher task.
pub struct TaskCoordinator<T> {
    inner: Arc<Mutex<Inner<T>>>,
    emitter: Option<EventEmitter>,
}

impl<T> Clone for TaskCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T> TaskCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a coordinator that emits no lifecycle events
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
            emitter: None,
        }
    }

    /// Create a coordinator that reports lifecycle events through `emitter`
    pub fn with_emitter(emitter: EventEmitter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
            emitter: Some(emitter),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        lock_inner(&self.inner)
    }

    /// True iff a connected task has not yet terminated. Side-effect free.
    pub fn is_running(&self) -> bool {
        self.lock().running()
    }

    /// Connect an async operation to this slot
    ///
    /// The operation is wrapped in a [`CachedTask`] and starts immediately.
    /// See [`connect_task`](Self::connect_task) for the contract.
    pub fn connect<F>(&self, op: F) -> Result<Connection<T>, CoordinatorError>
    where
        F: Future<Output = Outcome<T>> + Send + 'static,
    {
        {
            // Precheck so a rejected connect never starts the operation;
            // connect_task re-validates under the same lock
            let inner = self.lock();
            if inner.destroyed {
                return Err(CoordinatorError::Destroyed);
            }
            if inner.running() {
                return Err(CoordinatorError::AlreadyConnected);
            }
        }
        self.connect_task(CachedTask::spawn(op))
    }

    /// Connect an already-spawned task to this slot
    ///
    /// Fails with [`CoordinatorError::AlreadyConnected`] if a task is still
    /// running - that is a caller sequencing bug, and existing state is left
    /// untouched. A retained terminated task (an unwitnessed outcome) is
    /// displaced by the new connection.
    ///
    /// Returns the keep-alive [`Connection`] guard. Cancel it (or drop it)
    /// when the owning side detaches; doing so stops only the keep-alive
    /// watcher, never the operation and never an attached observer's
    /// delivery.
    pub fn connect_task(&self, task: CachedTask<T>) -> Result<Connection<T>, CoordinatorError> {
        let conn_epoch;
        let delivery;
        {
            let mut inner = self.lock();
            if inner.destroyed {
                return Err(CoordinatorError::Destroyed);
            }
            if inner.running() {
                warn!(task_id = %task.id(), "connect: slot already has a running task");
                return Err(CoordinatorError::AlreadyConnected);
            }

            debug!(task_id = %task.id(), subscribed = inner.factory.is_some(), "connect: wiring task");
            if let Some(handle) = inner.keep_alive.take() {
                handle.abort();
            }
            if let Some(handle) = inner.tracker.take() {
                handle.abort();
            }
            inner.task = Some(task.clone());
            inner.conn_epoch += 1;
            conn_epoch = inner.conn_epoch;

            let ka_task = task.clone();
            let ka_emitter = self.emitter.clone();
            inner.keep_alive = Some(tokio::spawn(async move {
                let outcome = ka_task.outcome().await;
                debug!(task_id = %ka_task.id(), kind = outcome.kind(), "keep-alive: task terminated");
                if let Some(emitter) = ka_emitter {
                    emitter.task_finished(ka_task.id(), outcome.kind());
                }
            }));

            if let Some(emitter) = &self.emitter {
                emitter.task_connected(task.id());
            }

            delivery = if inner.factory.is_some() {
                self.attach_observer(&mut inner, &task)
            } else {
                None
            };
        }

        self.deliver(delivery, task.id());
        Ok(Connection {
            inner: Arc::downgrade(&self.inner),
            conn_epoch,
            cancelled: false,
        })
    }

    /// Register an observer factory for this slot
    ///
    /// Fails with [`CoordinatorError::AlreadySubscribed`] if a factory is
    /// already registered; the existing factory is left in place. If a live
    /// task is connected, a fresh observer is created immediately; if a
    /// terminated task is retained, its buffered outcome is replayed to the
    /// fresh observer before this call returns.
    ///
    /// Returns the [`Subscription`] guard. Cancel it (or drop it) on detach;
    /// that clears the factory and discards the current observer instance so
    /// a stale observer never sees a late outcome.
    ///
    /// The factory runs inside the coordinator's critical section and must
    /// not call back into this coordinator. Observer callbacks run outside
    /// it and may.
    pub fn subscribe<F>(&self, factory: F) -> Result<Subscription<T>, CoordinatorError>
    where
        F: FnMut() -> Box<dyn Observer<T>> + Send + 'static,
    {
        let sub_epoch;
        let delivery;
        let mut task_id = String::new();
        {
            let mut inner = self.lock();
            if inner.destroyed {
                return Err(CoordinatorError::Destroyed);
            }
            if inner.factory.is_some() {
                warn!("subscribe: slot already has an observer factory");
                return Err(CoordinatorError::AlreadySubscribed);
            }

            inner.factory = Some(Box::new(factory));
            inner.sub_epoch += 1;
            sub_epoch = inner.sub_epoch;
            debug!(running = inner.running(), "subscribe: factory registered");

            if let Some(emitter) = &self.emitter {
                emitter.observer_attached();
            }

            delivery = match inner.task.clone() {
                Some(task) => {
                    task_id = task.id().to_string();
                    self.attach_observer(&mut inner, &task)
                }
                None => None,
            };
        }

        self.deliver(delivery, &task_id);
        Ok(Subscription {
            inner: Arc::downgrade(&self.inner),
            emitter: self.emitter.clone(),
            sub_epoch,
            cancelled: false,
        })
    }

    /// Permanently tear down this slot
    ///
    /// Cancels the keep-alive watcher and completion tracker, drops the
    /// task, factory, and observer. Idempotent.
    pub fn on_destroy(&self) {
        let mut inner = self.lock();
        if inner.destroyed {
            debug!("on_destroy: already destroyed");
            return;
        }
        debug!(running = inner.running(), "on_destroy: tearing down slot");
        inner.destroyed = true;
        if let Some(handle) = inner.keep_alive.take() {
            handle.abort();
        }
        if let Some(handle) = inner.tracker.take() {
            handle.abort();
        }
        inner.task = None;
        inner.factory = None;
        inner.observer = None;
        inner.sub_epoch += 1;
        if let Some(emitter) = &self.emitter {
            emitter.slot_destroyed();
        }
    }

    /// Build a fresh observer for `task` using the registered factory
    ///
    /// With a live task, the observer is parked and a completion tracker is
    /// spawned. With an already-terminated task, the buffered outcome is
    /// returned for the caller to replay once the state lock is released,
    /// and the task is cleared - each buffered outcome is witnessed once.
    fn attach_observer(
        &self,
        inner: &mut Inner<T>,
        task: &CachedTask<T>,
    ) -> Option<(Box<dyn Observer<T>>, Outcome<T>)> {
        let factory = inner.factory.as_mut()?;
        let observer = factory();

        if let Some(outcome) = task.peek() {
            debug!(task_id = %task.id(), kind = outcome.kind(), "attach: replaying buffered outcome");
            inner.task = None;
            return Some((observer, outcome));
        }

        debug!(task_id = %task.id(), "attach: observer parked, spawning completion tracker");
        inner.observer = Some(observer);
        let state = Arc::clone(&self.inner);
        let sub_epoch = inner.sub_epoch;
        let emitter = self.emitter.clone();
        inner.tracker = Some(tokio::spawn(track_completion(state, task.clone(), sub_epoch, emitter)));
        None
    }

    /// Run a replay delivery produced by [`attach_observer`]
    fn deliver(&self, delivery: Option<(Box<dyn Observer<T>>, Outcome<T>)>, task_id: &str) {
        if let Some((mut observer, outcome)) = delivery {
            if let Some(emitter) = &self.emitter {
                emitter.outcome_delivered(task_id, outcome.kind(), true);
            }
            observer.on_outcome(outcome);
        }
    }
}

impl<T> Default for TaskCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TaskCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_inner(&self.inner);
        f.debug_struct("TaskCoordinator")
            .field("running", &inner.running())
            .field("subscribed", &inner.factory.is_some())
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

/// Completion tracker for an attached observer
///
/// Waits out the task, then performs the terminal bookkeeping (the slot is
/// idle again) before handing the outcome to the observer outside the lock -
/// delivery is never preempted by the disposal. A tracker whose subscription
/// epoch has moved on delivers nothing.
async fn track_completion<T>(
    state: Arc<Mutex<Inner<T>>>,
    task: CachedTask<T>,
    sub_epoch: u64,
    emitter: Option<EventEmitter>,
) where
    T: Clone + Send + Sync + 'static,
{
    let outcome = task.outcome().await;

    let observer = {
        let mut inner = lock_inner(&state);
        if inner.destroyed || inner.sub_epoch != sub_epoch {
            debug!(task_id = %task.id(), "tracker: subscription gone, dropping outcome");
            return;
        }
        inner.task = None;
        inner.tracker = None;
        inner.observer.take()
    };

    if let Some(mut observer) = observer {
        debug!(task_id = %task.id(), kind = outcome.kind(), "tracker: delivering outcome");
        if let Some(emitter) = &emitter {
            emitter.outcome_delivered(task.id(), outcome.kind(), false);
        }
        observer.on_outcome(outcome);
    }
}

/// Keep-alive guard returned by [`TaskCoordinator::connect_task`]
///
/// Cancelling (or dropping) it stops the coordinator's keep-alive watcher.
/// It does not abort the underlying operation - other handles (an attached
/// observer's tracker, the cached task itself) keep it witnessed - and it
/// does not detach the observer.
#[must_use = "dropping the connection cancels the keep-alive watcher"]
pub struct Connection<T> {
    inner: Weak<Mutex<Inner<T>>>,
    conn_epoch: u64,
    cancelled: bool,
}

impl<T> Connection<T> {
    /// Stop the keep-alive watcher
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(state) = self.inner.upgrade() {
            let mut inner = lock_inner(&state);
            // A newer connect owns the current keep-alive
            if inner.destroyed || inner.conn_epoch != self.conn_epoch {
                return;
            }
            debug!("connection cancelled: stopping keep-alive watcher");
            if let Some(handle) = inner.keep_alive.take() {
                handle.abort();
            }
        }
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("conn_epoch", &self.conn_epoch)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Observer attachment guard returned by [`TaskCoordinator::subscribe`]
///
/// Cancelling (or dropping) it clears the stored factory and discards the
/// live observer instance, so an outcome arriving later is buffered for the
/// next attach instead of reaching a stale observer. The underlying
/// operation is unaffected.
#[must_use = "dropping the subscription detaches the observer"]
pub struct Subscription<T> {
    inner: Weak<Mutex<Inner<T>>>,
    emitter: Option<EventEmitter>,
    sub_epoch: u64,
    cancelled: bool,
}

impl<T> Subscription<T> {
    /// Detach the observer and clear the factory
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(state) = self.inner.upgrade() {
            let mut inner = lock_inner(&state);
            // A newer subscribe owns the current factory
            if inner.destroyed || inner.sub_epoch != self.sub_epoch {
                return;
            }
            debug!("subscription cancelled: detaching observer");
            inner.factory = None;
            inner.observer = None;
            inner.sub_epoch += 1;
            if let Some(handle) = inner.tracker.take() {
                handle.abort();
            }
            if let Some(emitter) = &self.emitter {
                emitter.observer_detached();
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("sub_epoch", &self.sub_epoch)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
