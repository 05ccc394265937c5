//! Holdover sample driver
//!
//! Simulates the lifecycle the library exists for: an operation is started,
//! the observing side detaches mid-flight (a recreation), and a fresh
//! observer attaches later - receiving the outcome exactly once, whether it
//! arrives while attached or gets buffered and replayed.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tracing::{debug, info};

use holdover::cli::{Cli, Command};
use holdover::config::Config;
use holdover::coordinator::{FnObserver, Observer};
use holdover::events::{EventBus, read_slot_events, spawn_event_logger};
use holdover::host::TaskHost;
use holdover::retry::{Backoff, with_backoff};
use holdover::{Outcome, TaskError};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let level = cli_log_level.or(config_log_level).unwrap_or("info");
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref())?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref())?;

    match cli.command {
        Some(Command::Demo {
            task_ms,
            detach_after_ms,
            reattach_after_ms,
            fail,
            attempts,
        }) => run_demo(&config, task_ms, detach_after_ms, reattach_after_ms, fail, attempts).await,
        Some(Command::Events { slot }) => show_events(&config, &slot),
        None => {
            println!("No command given; try `ho demo` or `ho --help`");
            Ok(())
        }
    }
}

/// Build the simulated operation: sleeps, then succeeds or fails
async fn simulated_op(task_ms: u64, fail: bool) -> Outcome<u64> {
    tokio::time::sleep(Duration::from_millis(task_ms)).await;
    if fail {
        Outcome::Error(TaskError::new("simulated failure"))
    } else {
        Outcome::Value(42)
    }
}

async fn run_demo(
    config: &Config,
    task_ms: u64,
    detach_after_ms: u64,
    reattach_after_ms: u64,
    fail: bool,
    attempts: u32,
) -> Result<()> {
    info!(task_ms, detach_after_ms, reattach_after_ms, fail, attempts, "demo: starting");

    let bus = Arc::new(EventBus::new(config.events.channel_capacity));
    let log_dir = config.events.resolved_log_dir();
    let logger = if config.events.log_enabled {
        Some(spawn_event_logger(Arc::clone(&bus), &log_dir)?)
    } else {
        None
    };

    let host = TaskHost::with_bus(Arc::clone(&bus));
    let coordinator = host.slot::<u64>("demo")?;

    // Start the work; with --attempts > 1 the operation retries internally
    // before the coordinator ever sees an error
    let policy = Backoff {
        max_attempts: attempts,
        initial_delay_ms: 100,
        jitter: true,
    };
    let connection = coordinator.connect(with_backoff(policy, move || simulated_op(task_ms, fail)))?;
    println!("connected: operation running ({}ms)", task_ms);

    // First attach: this observer will be torn down before the outcome lands
    let first = coordinator.subscribe(|| -> Box<dyn Observer<u64>> {
        Box::new(FnObserver::new(|outcome| {
            println!("observer #1 received: {:?}", outcome);
        }))
    })?;
    println!("observer #1 attached");

    tokio::time::sleep(Duration::from_millis(detach_after_ms)).await;
    first.cancel();
    println!("observer #1 detached (simulated recreation), still running: {}", coordinator.is_running());

    tokio::time::sleep(Duration::from_millis(reattach_after_ms)).await;

    // Second attach: fresh observer; the outcome is delivered live or
    // replayed from the buffer depending on the timing knobs
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let second = coordinator.subscribe(move || -> Box<dyn Observer<u64>> {
        let tx = tx.clone();
        Box::new(FnObserver::new(move |outcome| {
            let _ = tx.send(outcome);
        }))
    })?;
    println!("observer #2 attached, still running: {}", coordinator.is_running());

    let wait = Duration::from_millis(task_ms * u64::from(attempts.max(1)) + 2000);
    match tokio::time::timeout(wait, rx.recv()).await {
        Ok(Some(outcome)) => println!("observer #2 received: {:?}", outcome),
        Ok(None) | Err(_) => println!("observer #2 received nothing (timed out)"),
    }

    // Detach and tear down for good
    second.cancel();
    connection.cancel();
    host.destroy();

    if let Some(handle) = logger {
        // Let the logger drain the destroy event before stopping it
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        println!("events written under {}", log_dir.display());
    }

    debug!("demo: complete");
    Ok(())
}

fn show_events(config: &Config, slot: &str) -> Result<()> {
    let log_dir = config.events.resolved_log_dir();
    let entries = read_slot_events(&log_dir, slot)?;

    if entries.is_empty() {
        println!("no events logged for slot '{}' under {}", slot, log_dir.display());
        return Ok(());
    }

    for entry in entries {
        println!(
            "{} {:<18} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.event.event_type(),
            serde_json::to_string(&entry.event)?
        );
    }
    Ok(())
}
