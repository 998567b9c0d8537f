// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote document store abstraction.
//!
//! The sync engine never talks to a concrete backend. Everything goes through
//! [`RemoteStore`], which is object safe so it can be shared as
//! `Arc<dyn RemoteStore>`:
//! - [`MemoryStore`](super::MemoryStore) for tests and offline demos
//! - [`WebSocketStore`](super::WebSocketStore) for a `fleet-remote` server

use std::future::Future;
use std::pin::Pin;

use fleet_core::{Document, Query, Record};
use tokio::sync::mpsc;

/// Boxed future returned by store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for remote store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached. Retrying later may succeed.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the request.
    #[error("rejected by remote store: {0}")]
    Rejected(String),

    /// The request was malformed.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl StoreError {
    /// Returns true for errors caused by connectivity.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for remote store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Where a subscription reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Local cache only. Never contacts the server.
    Cache,
    /// Server, with live updates.
    Server,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Cache => write!(f, "cache"),
            Source::Server => write!(f, "server"),
        }
    }
}

/// Result set delivered by a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub from_cache: bool,
}

/// Live query results. Dropping the receiver ends the subscription.
pub type SnapshotStream = mpsc::UnboundedReceiver<StoreResult<Snapshot>>;

/// Remote document store collaborator.
pub trait RemoteStore: Send + Sync {
    /// Creates a document with a store-assigned id and returns the id.
    fn create_document<'a>(
        &'a self,
        collection: &'a str,
        data: Document,
    ) -> BoxFuture<'a, StoreResult<String>>;

    /// Writes a document, merging into an existing one when `merge` is set.
    fn set_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        data: Document,
        merge: bool,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Deletes a document. Deleting a missing document succeeds.
    fn delete_document<'a>(&'a self, collection: &'a str, id: &'a str)
        -> BoxFuture<'a, StoreResult<()>>;

    /// Starts a live query.
    ///
    /// Failures, including a server that cannot be reached, are delivered
    /// through the stream.
    fn subscribe(&self, collection: &str, query: &Query, source: Source) -> SnapshotStream;
}
