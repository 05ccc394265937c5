//! Event Logger - persists lifecycle events to JSONL files
//!
//! Subscribes to the [`EventBus`] and appends every event to a per-slot
//! JSONL file for history and debugging. A slot's writer is closed when its
//! `SlotDestroyed` event arrives.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, HoEvent};

/// Event logger that writes events to JSONL files
///
/// Events land in `<log_dir>/{slot}/events.jsonl`.
pub struct EventLogger {
    /// Base directory for slot logs
    log_dir: PathBuf,
    /// Open file writers per slot
    writers: HashMap<String, BufWriter<File>>,
}

impl EventLogger {
    /// Create a new event logger writing under `log_dir`
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        let log_dir = log_dir.as_ref().to_path_buf();
        debug!(?log_dir, "EventLogger::new: creating logger");
        Self {
            log_dir,
            writers: HashMap::new(),
        }
    }

    /// Create a logger with the default directory under the user's data dir
    pub fn with_default_path() -> eyre::Result<Self> {
        let data = dirs::data_local_dir().ok_or_else(|| eyre::eyre!("Could not determine data directory"))?;
        let log_dir = data.join("holdover").join("slots");
        fs::create_dir_all(&log_dir)?;
        Ok(Self::new(log_dir))
    }

    /// Write an event to its slot's log file
    pub fn write_event(&mut self, event: &HoEvent) -> eyre::Result<()> {
        let slot = event.slot();
        debug!(%slot, event_type = event.event_type(), "EventLogger::write_event");

        if !self.writers.contains_key(slot) {
            let slot_dir = self.log_dir.join(slot);
            fs::create_dir_all(&slot_dir)?;

            let log_path = slot_dir.join("events.jsonl");
            debug!(?log_path, "EventLogger: creating new log file");

            let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
            self.writers.insert(slot.to_string(), BufWriter::new(file));
        }
        let writer = self
            .writers
            .get_mut(slot)
            .ok_or_else(|| eyre::eyre!("writer missing for slot {slot}"))?;

        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// Close the writer for a slot (on `SlotDestroyed`)
    pub fn close_slot(&mut self, slot: &str) {
        debug!(%slot, "EventLogger::close_slot");
        if let Some(mut writer) = self.writers.remove(slot) {
            let _ = writer.flush();
        }
    }

    /// Run the logger, consuming events from the bus until it closes
    ///
    /// Meant to be spawned as a background task.
    pub async fn run(mut self, event_bus: Arc<EventBus>) {
        debug!("EventLogger::run: starting event logger");
        let mut rx = event_bus.subscribe();

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let slot = event.slot().to_string();
                    let is_destroyed = matches!(event, HoEvent::SlotDestroyed { .. });

                    if let Err(e) = self.write_event(&event) {
                        error!(%slot, error = %e, "EventLogger: failed to write event");
                    }

                    if is_destroyed {
                        self.close_slot(&slot);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        for (slot, mut writer) in self.writers.drain() {
            debug!(%slot, "EventLogger: flushing writer on shutdown");
            let _ = writer.flush();
        }
    }
}

/// Read events back from a slot's log file
pub fn read_slot_events(log_dir: impl AsRef<Path>, slot: &str) -> eyre::Result<Vec<EventLogEntry>> {
    let log_path = log_dir.as_ref().join(slot).join("events.jsonl");
    debug!(?log_path, "read_slot_events: reading log file");

    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_slot_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_slot_events: loaded entries");
    Ok(entries)
}

/// Spawn an event logger writing under `log_dir` as a background task
pub fn spawn_event_logger(
    event_bus: Arc<EventBus>,
    log_dir: impl AsRef<Path>,
) -> eyre::Result<tokio::task::JoinHandle<()>> {
    fs::create_dir_all(log_dir.as_ref())?;
    let logger = EventLogger::new(log_dir);
    Ok(tokio::spawn(async move {
        logger.run(event_bus).await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_event_logger_creation() {
        let temp = tempdir().unwrap();
        let logger = EventLogger::new(temp.path());
        assert!(logger.writers.is_empty());
    }

    #[test]
    fn test_write_event() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger
            .write_event(&HoEvent::TaskConnected {
                slot: "save".to_string(),
                task_id: "t-1".to_string(),
            })
            .unwrap();

        let log_path = temp.path().join("save").join("events.jsonl");
        assert!(log_path.exists());

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("TaskConnected"));
        assert!(content.contains("t-1"));
    }

    #[test]
    fn test_multiple_events_same_slot() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger
            .write_event(&HoEvent::TaskConnected {
                slot: "save".to_string(),
                task_id: "t-1".to_string(),
            })
            .unwrap();
        logger
            .write_event(&HoEvent::ObserverAttached {
                slot: "save".to_string(),
            })
            .unwrap();
        logger
            .write_event(&HoEvent::TaskFinished {
                slot: "save".to_string(),
                task_id: "t-1".to_string(),
                kind: "value".to_string(),
            })
            .unwrap();

        let content = fs::read_to_string(temp.path().join("save").join("events.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_multiple_slots() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger
            .write_event(&HoEvent::ObserverAttached {
                slot: "save".to_string(),
            })
            .unwrap();
        logger
            .write_event(&HoEvent::ObserverAttached {
                slot: "list".to_string(),
            })
            .unwrap();

        assert!(temp.path().join("save").join("events.jsonl").exists());
        assert!(temp.path().join("list").join("events.jsonl").exists());
    }

    #[test]
    fn test_read_slot_events() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger
            .write_event(&HoEvent::TaskConnected {
                slot: "save".to_string(),
                task_id: "t-1".to_string(),
            })
            .unwrap();
        logger
            .write_event(&HoEvent::TaskFinished {
                slot: "save".to_string(),
                task_id: "t-1".to_string(),
                kind: "empty".to_string(),
            })
            .unwrap();

        let entries = read_slot_events(temp.path(), "save").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.event_type(), "TaskConnected");
        assert_eq!(entries[1].event.event_type(), "TaskFinished");
    }

    #[test]
    fn test_read_nonexistent_slot() {
        let temp = tempdir().unwrap();
        let entries = read_slot_events(temp.path(), "nope").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_close_slot() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger
            .write_event(&HoEvent::ObserverAttached {
                slot: "save".to_string(),
            })
            .unwrap();
        assert!(logger.writers.contains_key("save"));

        logger.close_slot("save");
        assert!(!logger.writers.contains_key("save"));
    }

    #[tokio::test]
    async fn test_logger_run_consumes_bus_events() {
        let temp = tempdir().unwrap();
        let bus = create_bus();
        let handle = spawn_event_logger(Arc::clone(&bus), temp.path()).unwrap();

        let emitter = bus.emitter_for("demo");
        emitter.task_connected("t-1");
        emitter.task_finished("t-1", "value");
        emitter.slot_destroyed();

        // Give the logger a moment to drain the channel
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let entries = read_slot_events(temp.path(), "demo").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].event.event_type(), "SlotDestroyed");

        drop(bus);
        handle.abort();
    }

    fn create_bus() -> Arc<EventBus> {
        Arc::new(EventBus::new(64))
    }
}
