// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first writes and cache-aware reads against a remote document store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  online   ┌──────────────┐     ┌──────────────┐
//! │ OfflineSubmitter │──────────►│ RemoteStore  │────►│ fleet-remote │
//! └──────────────────┘           │   (trait)    │◄────│   server     │
//!          │ offline             └──────────────┘     └──────────────┘
//!          ▼                        ▲        ▲
//! ┌──────────────────┐   replay     │        │ live queries
//! │  MutationQueue   │──────────────┘ ┌──────────────────┐
//! │ (PersistentQueue │                │ CacheAwareReader │
//! │   + LocalStorage)│                └──────────────────┘
//! └──────────────────┘
//!          ▲ status changes
//! ┌──────────────────┐
//! │  NetworkMonitor  │◄── ConnectivityProbe
//! └──────────────────┘
//! ```
//!
//! # Features
//!
//! - Durable FIFO mutation queue, persisted as one JSON blob in `LocalStorage`
//! - Sequential replay on reconnect, guarded so only one pass runs at a time
//! - Attempt counting with backoff, and a dead-letter list for items that
//!   keep failing
//! - Live queries that read from the server when online and the local cache
//!   otherwise
//! - Injectable store, storage, probe and transport for testing

mod coordinator;
mod engine;
mod hub;
mod memory;
mod network;
mod queue;
mod reader;
mod storage;
mod store;
mod transport;
mod websocket;

pub use coordinator::{OfflineSubmitter, SubmitError, Submission, WritePath};
pub use engine::{
    MutationQueue, QueueEvent, QueueOptions, ReplayReport, RetryPolicy, SkipReason,
};
pub use memory::{Call, MemoryStore};
pub use network::{spawn_probe, ConnectivityProbe, NetworkMonitor, ProbeReport, TcpProbe};
pub use queue::{PersistentQueueStore, QueueError};
pub use reader::{CacheAwareReader, LiveQuery, ReadOptions, ReadState};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use store::{RemoteStore, Snapshot, SnapshotStream, Source, StoreError, StoreResult};
pub use transport::{Transport, TransportError, WebSocketTransport};
pub use websocket::{RemoteConfig, WebSocketStore};

#[cfg(test)]
pub(crate) mod test_helpers;
