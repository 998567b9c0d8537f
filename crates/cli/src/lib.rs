// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fleetrs - offline-first writes and live reads for a fleet document store.
//!
//! This crate provides the functionality behind the `fleet` CLI: a durable
//! mutation queue that absorbs writes while the `fleet-remote` server is
//! unreachable and replays them once it is back, plus live queries that read
//! from the server when online and from a local cache otherwise.
//!
//! # Main Components
//!
//! - [`sync::OfflineSubmitter`] - Writes directly when online, queues when offline
//! - [`sync::MutationQueue`] - Persistent FIFO queue with replay and dead letters
//! - [`sync::CacheAwareReader`] - Live queries with cache fallback
//! - [`sync::NetworkMonitor`] - Connectivity state fed by a probe
//! - [`Config`] - Project configuration in `.fleet/config.toml`
//! - [`Error`] - Error types for all operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleetrs::sync::{MemoryStore, MemoryStorage, MutationQueue, NetworkMonitor,
//!     OfflineSubmitter, PersistentQueueStore, QueueOptions};
//!
//! let store = Arc::new(MemoryStore::new());
//! let monitor = NetworkMonitor::new(false);
//! let persistence = PersistentQueueStore::new(Arc::new(MemoryStorage::new()), "queue");
//! let queue = MutationQueue::open(store.clone(), monitor.clone(), persistence, QueueOptions::default());
//!
//! let submitter = OfflineSubmitter::new("vehicles", store, queue.clone())?;
//! submitter.submit(doc, None).await?;  // queued: the monitor says offline
//!
//! monitor.set_online(true);
//! queue.process_queue().await;          // replayed
//! ```

mod cli;
mod commands;
mod env;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat, QueueCommand, WatchArgs};
pub use config::{find_data_dir, init_data_dir, Config};
pub use error::{Error, Result};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber.
///
/// `--verbose` logs at debug level; otherwise `FLEET_LOG` holds the filter,
/// defaulting to warnings only.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        env::log_filter()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };
    // A subscriber installed by the embedding program wins.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)?;
    }
    match cli.command {
        Command::Init { remote } => commands::init::run(remote),
        command => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_async(command))
        }
    }
}

async fn run_async(command: Command) -> Result<()> {
    match command {
        Command::Init { remote } => commands::init::run(remote),
        Command::Status { output } => commands::status::run(output).await,
        Command::Submit {
            collection,
            data,
            id,
        } => commands::submit::run(collection, data, id).await,
        Command::Remove { collection, id } => commands::submit::remove(collection, id).await,
        Command::Sync { output } => commands::sync::run(output).await,
        Command::Queue(cmd) => commands::queue::run(cmd),
        Command::Watch(args) => commands::watch::run(args).await,
    }
}
