// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Documents with live query watchers.

use fleet_core::{Document, DocumentSet, Query};
use tokio::sync::mpsc;

use super::store::{Snapshot, SnapshotStream, StoreError};

struct Watcher {
    collection: String,
    query: Query,
    tx: mpsc::UnboundedSender<Result<Snapshot, StoreError>>,
}

/// A [`DocumentSet`] that pushes fresh query results to watchers after
/// every change to a watched collection.
pub(crate) struct DocumentHub {
    docs: DocumentSet,
    watchers: Vec<Watcher>,
    from_cache: bool,
}

impl DocumentHub {
    /// `from_cache` is copied into every snapshot this hub emits.
    pub fn new(from_cache: bool) -> Self {
        DocumentHub {
            docs: DocumentSet::new(),
            watchers: Vec::new(),
            from_cache,
        }
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.docs
    }

    /// Replaces all documents, notifying every watcher.
    pub fn load(&mut self, docs: DocumentSet) {
        self.docs = docs;
        self.watchers.retain(|w| !w.tx.is_closed());
        let collections: Vec<String> = self.watchers.iter().map(|w| w.collection.clone()).collect();
        for collection in collections {
            self.notify(&collection);
        }
    }

    pub fn create(&mut self, collection: &str, data: Document) -> String {
        let id = self.docs.insert_new(collection, data);
        self.notify(collection);
        id
    }

    pub fn set(&mut self, collection: &str, id: &str, data: Document, merge: bool) {
        self.docs.set(collection, id, data, merge);
        self.notify(collection);
    }

    pub fn delete(&mut self, collection: &str, id: &str) {
        if self.docs.delete(collection, id) {
            self.notify(collection);
        }
    }

    /// Refreshes from a server result set.
    ///
    /// An unconstrained result is the whole collection; a constrained one
    /// only says which documents exist.
    pub fn absorb(&mut self, collection: &str, query: &Query, records: &[fleet_core::Record]) {
        if query.is_unconstrained() {
            self.docs.replace_collection(collection, records);
        } else {
            self.docs.upsert_records(collection, records);
        }
        self.notify(collection);
    }

    /// Starts watching a query. The current results are sent immediately.
    pub fn watch(&mut self, collection: &str, query: &Query) -> SnapshotStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = Watcher {
            collection: collection.to_string(),
            query: query.clone(),
            tx,
        };
        if self.send(&watcher) {
            self.watchers.push(watcher);
        }
        rx
    }

    /// Sends `error` to every watcher and drops them.
    pub fn fail_all(&mut self, error: &StoreError) {
        for watcher in self.watchers.drain(..) {
            let _ = watcher.tx.send(Err(error.clone()));
        }
    }

    /// Number of live watchers.
    pub fn watcher_count(&mut self) -> usize {
        self.watchers.retain(|w| !w.tx.is_closed());
        self.watchers.len()
    }

    fn notify(&mut self, collection: &str) {
        let watchers = std::mem::take(&mut self.watchers);
        self.watchers = watchers
            .into_iter()
            .filter(|w| w.collection != collection || self.send(w))
            .collect();
    }

    fn send(&self, watcher: &Watcher) -> bool {
        let snapshot = Snapshot {
            records: self.docs.query(&watcher.collection, &watcher.query),
            from_cache: self.from_cache,
        };
        watcher.tx.send(Ok(snapshot)).is_ok()
    }
}
