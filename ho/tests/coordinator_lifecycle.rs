//! Integration tests for holdover
//!
//! These tests verify end-to-end behavior of coordinators, hosts, the event
//! bus, and the event logger working together.

use std::sync::Arc;
use std::time::Duration;

use holdover::coordinator::{FnObserver, Observer, TaskCoordinator};
use holdover::events::{EventBus, read_slot_events, spawn_event_logger};
use holdover::host::TaskHost;
use holdover::retry::{Backoff, with_backoff};
use holdover::{Outcome, TaskError};
use tempfile::TempDir;

/// Observer factory forwarding every outcome into an mpsc channel
fn channel_factory(
    tx: tokio::sync::mpsc::UnboundedSender<Outcome<u32>>,
) -> impl FnMut() -> Box<dyn Observer<u32>> + Send + 'static {
    move || {
        let tx = tx.clone();
        Box::new(FnObserver::new(move |outcome| {
            let _ = tx.send(outcome);
        }))
    }
}

// =============================================================================
// Timing scenario: connect a task that succeeds after ~100ms
// =============================================================================

#[tokio::test]
async fn test_is_running_flips_and_late_observer_sees_outcome() {
    let coordinator = TaskCoordinator::<u32>::new();

    let _connection = coordinator
        .connect(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Outcome::Value(42)
        })
        .unwrap();

    // Immediately after connect the task is in flight
    assert!(coordinator.is_running());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!coordinator.is_running());

    // An observer subscribing well after termination still receives the
    // outcome, exactly once
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = coordinator.subscribe(channel_factory(tx)).unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("delivery timed out")
        .expect("channel closed");
    assert_eq!(outcome, Outcome::Value(42));

    // No second delivery
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_observer_attached_before_termination_sees_outcome() {
    let coordinator = TaskCoordinator::<u32>::new();

    let _connection = coordinator
        .connect(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Outcome::Value(42)
        })
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = coordinator.subscribe(channel_factory(tx)).unwrap();
    assert!(coordinator.is_running());

    let outcome = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("delivery timed out")
        .expect("channel closed");
    assert_eq!(outcome, Outcome::Value(42));
    assert!(!coordinator.is_running());
}

// =============================================================================
// Rotation scenario: the observing side is rebuilt mid-flight
// =============================================================================

#[tokio::test]
async fn test_recreation_does_not_restart_or_lose_the_operation() {
    let host = TaskHost::new();
    let run_count = Arc::new(std::sync::atomic::AtomicU32::new(0));

    // "Screen" one starts the save
    {
        let coordinator = host.slot::<u32>("save").unwrap();
        let counter = Arc::clone(&run_count);
        let connection = coordinator
            .connect(async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(120)).await;
                Outcome::Value(1)
            })
            .unwrap();
        let subscription = coordinator
            .subscribe(|| -> Box<dyn Observer<u32>> { Box::new(FnObserver::new(|_| {})) })
            .unwrap();

        // Detach: the screen goes away
        subscription.cancel();
        connection.cancel();
    }

    // "Screen" two appears while the task is still running
    let coordinator = host.slot::<u32>("save").unwrap();
    assert!(coordinator.is_running());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = coordinator.subscribe(channel_factory(tx)).unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("delivery timed out")
        .expect("channel closed");
    assert_eq!(outcome, Outcome::Value(1));

    // The operation ran once; recreation did not restart it
    assert_eq!(run_count.load(std::sync::atomic::Ordering::SeqCst), 1);
}

// =============================================================================
// Event bus + logger
// =============================================================================

#[tokio::test]
async fn test_lifecycle_events_are_emitted_and_logged() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let bus = Arc::new(EventBus::new(64));
    let logger = spawn_event_logger(Arc::clone(&bus), temp.path()).unwrap();

    let host = TaskHost::with_bus(Arc::clone(&bus));
    let coordinator = host.slot::<u32>("save").unwrap();

    let _connection = coordinator.connect(async { Outcome::Value(5) }).unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = coordinator.subscribe(channel_factory(tx)).unwrap();
    assert_eq!(rx.recv().await.unwrap(), Outcome::Value(5));

    host.destroy();
    tokio::time::sleep(Duration::from_millis(150)).await;
    logger.abort();

    let entries = read_slot_events(temp.path(), "save").unwrap();
    let types: Vec<&str> = entries.iter().map(|e| e.event.event_type()).collect();

    assert!(types.contains(&"TaskConnected"));
    assert!(types.contains(&"TaskFinished"));
    assert!(types.contains(&"ObserverAttached"));
    assert!(types.contains(&"OutcomeDelivered"));
    assert_eq!(*types.last().unwrap(), "SlotDestroyed");

    // The delivery was a buffered replay, not a live hand-off
    let replayed = entries.iter().any(|e| {
        matches!(
            &e.event,
            holdover::HoEvent::OutcomeDelivered { replayed: true, .. }
        )
    });
    assert!(replayed);
}

// =============================================================================
// Retry decoration before connect
// =============================================================================

#[tokio::test]
async fn test_retry_decorated_operation_through_coordinator() {
    let coordinator = TaskCoordinator::<u32>::new();
    let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

    let policy = Backoff {
        max_attempts: 3,
        initial_delay_ms: 5,
        jitter: false,
    };
    let counter = Arc::clone(&calls);
    let op = with_backoff(policy, move || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                Outcome::Error(TaskError::new("transient"))
            } else {
                Outcome::Value(99)
            }
        }
    });

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = coordinator.subscribe(channel_factory(tx)).unwrap();
    let _connection = coordinator.connect(op).unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("delivery timed out")
        .expect("channel closed");

    // The coordinator saw one operation; the retries happened inside it
    assert_eq!(outcome, Outcome::Value(99));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}
