// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the canonical documents and the write log for thread-safe access.
//! Every applied write is appended to `writes.jsonl` before it becomes
//! visible, and the log is replayed on start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use fleet_core::document::{validate_collection_path, validate_document_id};
use fleet_core::{jsonl, Document, DocumentSet, Query, Record, Result};

const WRITE_LOG_FILE: &str = "writes.jsonl";

/// One applied write, as stored in the write log.
///
/// Creates are logged as a replacing `set` under the assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LoggedWrite {
    Set {
        collection: String,
        id: String,
        data: Document,
        #[serde(default)]
        merge: bool,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl LoggedWrite {
    fn apply(&self, docs: &mut DocumentSet) {
        match self {
            LoggedWrite::Set {
                collection,
                id,
                data,
                merge,
            } => docs.set(collection, id, data.clone(), *merge),
            LoggedWrite::Delete { collection, id } => {
                docs.delete(collection, id);
            }
        }
    }
}

/// Shared server state containing the canonical documents and write log.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    /// The canonical documents (protected by mutex for writes).
    docs: Mutex<DocumentSet>,
    log_path: PathBuf,
    /// Collection paths that changed, fanned out to every connection.
    changes_tx: broadcast::Sender<String>,
}

impl ServerState {
    /// Opens the state in `data_dir`, replaying its write log.
    ///
    /// Unparsable log lines (e.g. a write torn by a crash) are skipped.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let log_path = data_dir.join(WRITE_LOG_FILE);

        let (writes, skipped) = jsonl::read_valid::<LoggedWrite>(&log_path)?;
        if skipped > 0 {
            tracing::warn!(skipped, path = %log_path.display(), "skipped unreadable log lines");
        }
        let mut docs = DocumentSet::new();
        for write in &writes {
            write.apply(&mut docs);
        }
        tracing::info!(writes = writes.len(), "write log replayed");

        let (changes_tx, _) = broadcast::channel(1024);
        Ok(ServerState {
            inner: Arc::new(ServerStateInner {
                docs: Mutex::new(docs),
                log_path,
                changes_tx,
            }),
        })
    }

    /// Creates a document under a fresh id and returns the id.
    pub async fn create(&self, collection: &str, data: Document) -> Result<String> {
        validate_collection_path(collection)?;
        let mut docs = self.inner.docs.lock().await;
        let id = docs.insert_new(collection, data.clone());
        let write = LoggedWrite::Set {
            collection: collection.to_string(),
            id: id.clone(),
            data,
            merge: false,
        };
        if let Err(e) = jsonl::append(&self.inner.log_path, &write) {
            docs.delete(collection, &id);
            return Err(e);
        }
        drop(docs);

        self.notify(collection);
        Ok(id)
    }

    /// Writes a document, merging into an existing one when `merge` is set.
    pub async fn set(&self, collection: &str, id: &str, data: Document, merge: bool) -> Result<()> {
        validate_collection_path(collection)?;
        validate_document_id(id)?;
        self.commit(LoggedWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            merge,
        })
        .await?;
        self.notify(collection);
        Ok(())
    }

    /// Deletes a document. Deleting a missing document succeeds.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        validate_collection_path(collection)?;
        validate_document_id(id)?;
        self.commit(LoggedWrite::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        })
        .await?;
        self.notify(collection);
        Ok(())
    }

    async fn commit(&self, write: LoggedWrite) -> Result<()> {
        let mut docs = self.inner.docs.lock().await;
        jsonl::append(&self.inner.log_path, &write)?;
        write.apply(&mut docs);
        Ok(())
    }

    fn notify(&self, collection: &str) {
        // No connections is fine.
        let _ = self.inner.changes_tx.send(collection.to_string());
    }

    /// Evaluates a query after validating the path and constraints.
    pub async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Record>> {
        validate_collection_path(collection)?;
        query.validate()?;
        let docs = self.inner.docs.lock().await;
        Ok(docs.query(collection, query))
    }

    /// Returns one document.
    pub async fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.inner.docs.lock().await.get(collection, id).cloned()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inner.changes_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
