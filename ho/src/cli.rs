//! CLI command definitions for the sample driver

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Holdover sample driver
#[derive(Parser)]
#[command(
    name = "ho",
    about = "Drive holdover coordinators through a simulated attach/detach lifecycle",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the demo lifecycle: connect, detach mid-flight, re-attach, replay
    Demo {
        /// How long the simulated operation takes (ms)
        #[arg(long, default_value_t = 400)]
        task_ms: u64,

        /// Detach the first observer after this long (ms)
        #[arg(long, default_value_t = 150)]
        detach_after_ms: u64,

        /// Re-attach a fresh observer this long after detaching (ms)
        #[arg(long, default_value_t = 150)]
        reattach_after_ms: u64,

        /// Fail the operation instead of succeeding
        #[arg(long)]
        fail: bool,

        /// Retry a failing operation with exponential backoff
        #[arg(long, default_value_t = 1)]
        attempts: u32,
    },

    /// Print the logged events of a slot
    Events {
        /// Slot name
        #[arg(value_name = "SLOT")]
        slot: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_demo_defaults() {
        let cli = Cli::parse_from(["ho", "demo"]);
        match cli.command {
            Some(Command::Demo {
                task_ms,
                detach_after_ms,
                reattach_after_ms,
                fail,
                attempts,
            }) => {
                assert_eq!(task_ms, 400);
                assert_eq!(detach_after_ms, 150);
                assert_eq!(reattach_after_ms, 150);
                assert!(!fail);
                assert_eq!(attempts, 1);
            }
            _ => panic!("expected demo subcommand"),
        }
    }

    #[test]
    fn test_events_subcommand() {
        let cli = Cli::parse_from(["ho", "events", "demo"]);
        match cli.command {
            Some(Command::Events { slot }) => assert_eq!(slot, "demo"),
            _ => panic!("expected events subcommand"),
        }
    }
}
