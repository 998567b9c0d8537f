// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for the pending-operation queue.
//!
//! The whole queue is stored as one JSON array under a storage key, and the
//! dead-letter list as another array under `<key>_dead_letter`. Every change
//! goes through [`PersistentQueueStore::update`], which re-reads both lists,
//! applies the change and rewrites them inside one storage transaction, so
//! several processes sharing a state directory never drop each other's
//! writes.

use std::sync::Arc;

use fleet_core::{DeadLetter, QueueItem};
use serde::de::DeserializeOwned;

use super::storage::{LocalStorage, StorageError, StorageTransaction};

/// Error type for queue persistence.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for queue persistence.
pub type QueueResult<T> = Result<T, QueueError>;

/// Reads and writes the queue blobs.
#[derive(Clone)]
pub struct PersistentQueueStore {
    storage: Arc<dyn LocalStorage>,
    key: String,
    dead_letter_key: String,
}

impl PersistentQueueStore {
    /// Storage key used when none is configured.
    pub const DEFAULT_KEY: &'static str = "offline_operations_queue";

    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        PersistentQueueStore {
            dead_letter_key: format!("{key}_dead_letter"),
            storage,
            key,
        }
    }

    /// Key holding the queue.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key holding the dead-letter list.
    pub fn dead_letter_key(&self) -> &str {
        &self.dead_letter_key
    }

    /// Reads the queue. A missing key is an empty queue.
    pub fn load(&self) -> QueueResult<Vec<QueueItem>> {
        self.read(&self.key)
    }

    pub fn load_dead_letters(&self) -> QueueResult<Vec<DeadLetter>> {
        self.read(&self.dead_letter_key)
    }

    /// Changes the stored queue and dead letters under the storage lock.
    ///
    /// `f` receives both lists as currently stored; whatever it leaves in
    /// them is written back. An unparsable stored list is handed over as
    /// empty and overwritten. If reading fails, `f` is not called and
    /// nothing is written. An empty dead-letter list removes its key.
    pub fn update<F>(&self, f: F) -> QueueResult<()>
    where
        F: FnOnce(&mut Vec<QueueItem>, &mut Vec<DeadLetter>),
    {
        let mut pending = Some(f);
        let mut outcome = Ok(());
        self.storage.transaction(&mut |txn| {
            if let Some(f) = pending.take() {
                outcome = self.update_locked(txn, f);
            }
        })?;
        outcome
    }

    fn update_locked<F>(&self, txn: &mut dyn StorageTransaction, f: F) -> QueueResult<()>
    where
        F: FnOnce(&mut Vec<QueueItem>, &mut Vec<DeadLetter>),
    {
        let mut items = self.parse_or_empty(&self.key, txn.get_item(&self.key)?);
        let mut dead = self.parse_or_empty(&self.dead_letter_key, txn.get_item(&self.dead_letter_key)?);

        f(&mut items, &mut dead);

        txn.set_item(&self.key, &serde_json::to_string(&items)?)?;
        if dead.is_empty() {
            txn.remove_item(&self.dead_letter_key)?;
        } else {
            txn.set_item(&self.dead_letter_key, &serde_json::to_string(&dead)?)?;
        }
        Ok(())
    }

    fn parse_or_empty<T: DeserializeOwned>(&self, key: &str, raw: Option<String>) -> Vec<T> {
        match raw.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "discarding unparsable stored list");
                Vec::new()
            }),
            _ => Vec::new(),
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> QueueResult<Vec<T>> {
        match self.storage.get_item(key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }
}
