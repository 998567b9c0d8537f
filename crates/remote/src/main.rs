// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fleet-remote: WebSocket document server for the fleet sync engine.
//!
//! This server holds the canonical documents, answers writes from `fleet`
//! clients, and pushes fresh snapshots to live queries whenever a collection
//! changes. Every applied write is logged to `writes.jsonl` in the data
//! directory and replayed on start.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// fleet-remote: document server for offline-first fleet clients
#[derive(Parser, Debug)]
#[command(name = "fleet-remote")]
#[command(about = "WebSocket document server for offline-first fleet clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the write log
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // RUST_LOG wins over the default level
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Starting fleet-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = state::ServerState::new(&args.data)?;
    server::run(args.bind, state).await
}
