//! TaskHost - retained registry of coordinator slots
//!
//! The host is the piece that survives recreation of the observing side: a
//! screen (or session, or any lifecycle-bound unit) asks its host for named
//! slots, and gets the same coordinator back after being rebuilt. Destroying
//! the host - once, at permanent teardown - destroys every slot.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

use crate::coordinator::TaskCoordinator;
use crate::events::EventBus;

/// Errors from host slot operations
#[derive(Debug, Error)]
pub enum HostError {
    /// The slot exists with a different result type
    #[error("slot {name} already holds a coordinator of a different result type")]
    SlotType { name: String },

    /// The host was already destroyed
    #[error("host has been destroyed")]
    Destroyed,
}

/// Type-erased view of a coordinator slot
trait Slot: Send + Sync {
    fn destroy(&self);
    fn running(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T> Slot for TaskCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn destroy(&self) {
        self.on_destroy();
    }

    fn running(&self) -> bool {
        self.is_running()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct HostInner {
    slots: HashMap<String, Box<dyn Slot>>,
    destroyed: bool,
}

/// Owns the coordinators of one logical unit of retained state
///
/// Each slot name maps to one [`TaskCoordinator`]; asking for the same name
/// twice returns a handle onto the same slot. Slots are created lazily and
/// live until [`destroy`](Self::destroy) (or drop).
pub struct TaskHost {
    inner: Mutex<HostInner>,
    bus: Option<Arc<EventBus>>,
}

impl TaskHost {
    /// Create a host whose coordinators emit no lifecycle events
    pub fn new() -> Self {
        debug!("TaskHost::new: creating host");
        Self {
            inner: Mutex::new(HostInner {
                slots: HashMap::new(),
                destroyed: false,
            }),
            bus: None,
        }
    }

    /// Create a host whose coordinators report through `bus`
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        debug!("TaskHost::with_bus: creating host");
        Self {
            inner: Mutex::new(HostInner {
                slots: HashMap::new(),
                destroyed: false,
            }),
            bus: Some(bus),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get or create the coordinator for `name`
    ///
    /// Returns a handle onto the existing slot when one exists; fails with
    /// [`HostError::SlotType`] if it was created with a different result
    /// type.
    pub fn slot<T>(&self, name: &str) -> Result<TaskCoordinator<T>, HostError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        if inner.destroyed {
            return Err(HostError::Destroyed);
        }

        if let Some(existing) = inner.slots.get(name) {
            debug!(%name, "slot: returning existing coordinator");
            return existing
                .as_any()
                .downcast_ref::<TaskCoordinator<T>>()
                .cloned()
                .ok_or_else(|| HostError::SlotType { name: name.to_string() });
        }

        debug!(%name, "slot: creating coordinator");
        let coordinator = match &self.bus {
            Some(bus) => TaskCoordinator::with_emitter(bus.emitter_for(name)),
            None => TaskCoordinator::new(),
        };
        inner.slots.insert(name.to_string(), Box::new(coordinator.clone()));
        Ok(coordinator)
    }

    /// Number of slots with a task still running
    pub fn running_count(&self) -> usize {
        self.lock().slots.values().filter(|slot| slot.running()).count()
    }

    /// Names of all slots created so far
    pub fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().slots.keys().cloned().collect();
        names.sort();
        names
    }

    /// Permanently tear down every slot. Idempotent.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        if inner.destroyed {
            debug!("destroy: already destroyed");
            return;
        }
        inner.destroyed = true;
        info!(slot_count = inner.slots.len(), "TaskHost: destroying all slots");
        for (name, slot) in inner.slots.drain() {
            debug!(%name, "destroy: destroying slot");
            slot.destroy();
        }
    }
}

impl Default for TaskHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskHost {
    fn drop(&mut self) {
        self.destroy();
    }
}
