// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};

pub use args::WatchArgs;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "fleet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first writes and live reads for a fleet document store")]
#[command(
    long_about = "Offline-first writes and live reads for a fleet document store.\n\n\
    Writes go straight to the remote server while it is reachable and are queued \
    locally otherwise; `fleet sync` replays the queue once the server is back."
)]
pub struct Cli {
    /// Run as if fleet was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a .fleet directory here
    #[command(after_help = "\
Examples:
  fleet init                                 Use the default server (ws://127.0.0.1:7890)
  fleet init --remote wss://fleet.example    Use a specific server")]
    Init {
        /// WebSocket URL of the fleet-remote server
        #[arg(long, value_name = "url")]
        remote: Option<String>,
    },

    /// Show connectivity, queue and dead-letter state
    Status {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Create or update a document, queueing it when offline
    #[command(after_help = "\
Examples:
  fleet submit vehicles '{\"plate\": \"AB-123\"}'               Create a vehicle
  fleet submit vehicles '{\"status\": \"idle\"}' --id v1        Merge into vehicle v1")]
    Submit {
        /// Collection path
        #[arg(value_parser = non_empty_string)]
        collection: String,

        /// Document fields as a JSON object
        #[arg(value_parser = non_empty_string)]
        data: String,

        /// Update this document instead of creating one
        #[arg(long)]
        id: Option<String>,
    },

    /// Delete a document, queueing the delete when offline
    Remove {
        /// Collection path
        #[arg(value_parser = non_empty_string)]
        collection: String,

        /// Document id
        #[arg(value_parser = non_empty_string)]
        id: String,
    },

    /// Replay queued writes once
    Sync {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Inspect and manage the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Watch a live query
    #[command(after_help = "\
Examples:
  fleet watch vehicles                                  All vehicles, live
  fleet watch vehicles -w 'status == \"active\"' --once   Active vehicles, once
  fleet watch vehicles --order plate:desc -n 10         Last ten plates
  fleet watch vehicles --cache-only                     Local cache only")]
    Watch(WatchArgs),
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued writes in replay order
    List {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Discard every queued write
    Clear,

    /// List writes that exhausted their retries
    Dead {
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Move dead-lettered writes back to the queue
    RetryDead,

    /// Discard every dead letter
    ClearDead,
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
