// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory remote store.
//!
//! Keeps a server side and a cache side. Writes need the store to be
//! reachable and land on both sides; cache subscriptions read only the cache
//! side. Failures can be injected per call or per document, and every call is
//! recorded so tests can assert on exactly what reached the "server".

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use fleet_core::{Document, Query};
use tokio::sync::mpsc;

use super::hub::DocumentHub;
use super::store::{BoxFuture, RemoteStore, Snapshot, SnapshotStream, Source, StoreError, StoreResult};

/// A call received by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { collection: String },
    Set { collection: String, id: String, merge: bool },
    Delete { collection: String, id: String },
    Subscribe { collection: String, source: Source },
}

impl Call {
    /// Returns true for create, set and delete.
    #[cfg(test)]
    pub(crate) fn is_write(&self) -> bool {
        !matches!(self, Call::Subscribe { .. })
    }

    /// Returns true if the call needed the server.
    pub fn touches_server(&self) -> bool {
        !matches!(
            self,
            Call::Subscribe {
                source: Source::Cache,
                ..
            }
        )
    }
}

type WriteHook = Box<dyn Fn(&Call) -> Option<StoreError> + Send + Sync>;

struct State {
    server: DocumentHub,
    cache: DocumentHub,
    reachable: bool,
    failures: VecDeque<StoreError>,
    rejected: HashSet<(String, String)>,
    calls: Vec<Call>,
}

/// In-memory [`RemoteStore`] with a reachability switch and failure injection.
pub struct MemoryStore {
    state: Mutex<State>,
    hook: Mutex<Option<WriteHook>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, reachable store.
    pub fn new() -> Self {
        MemoryStore {
            state: Mutex::new(State {
                server: DocumentHub::new(false),
                cache: DocumentHub::new(true),
                reachable: true,
                failures: VecDeque::new(),
                rejected: HashSet::new(),
                calls: Vec::new(),
            }),
            hook: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switches reachability. Going unreachable fails live server
    /// subscriptions with [`StoreError::Unavailable`].
    pub fn set_reachable(&self, reachable: bool) {
        let mut state = self.lock();
        state.reachable = reachable;
        if !reachable {
            state
                .server
                .fail_all(&StoreError::Unavailable("server unreachable".to_string()));
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.lock().reachable
    }

    /// Makes the next write fail with `error`. Calls stack in FIFO order.
    pub fn fail_next(&self, error: StoreError) {
        self.lock().failures.push_back(error);
    }

    /// Makes every write to this document fail with [`StoreError::Rejected`].
    pub fn reject_document(&self, collection: &str, id: &str) {
        self.lock()
            .rejected
            .insert((collection.to_string(), id.to_string()));
    }

    /// Installs a hook run before each write is applied.
    ///
    /// Returning an error fails the write with it. The hook runs without any
    /// store lock held, so it may flip reachability or network status.
    pub fn before_write(&self, hook: impl Fn(&Call) -> Option<StoreError> + Send + Sync + 'static) {
        *self.hook.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(hook));
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that reached the server side.
    pub fn server_calls(&self) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.touches_server())
            .cloned()
            .collect()
    }

    /// Writes a document on both sides without recording a call.
    pub fn seed(&self, collection: &str, id: &str, data: Document) {
        let mut state = self.lock();
        state.server.set(collection, id, data.clone(), false);
        state.cache.set(collection, id, data, false);
    }

    /// Writes a document to the cache side only.
    pub fn seed_cache(&self, collection: &str, id: &str, data: Document) {
        self.lock().cache.set(collection, id, data, false);
    }

    /// A document as the server holds it.
    pub fn server_document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock().server.documents().get(collection, id).cloned()
    }

    /// A document as the cache holds it.
    pub fn cache_document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock().cache.documents().get(collection, id).cloned()
    }

    /// Number of documents the server holds in a collection.
    pub fn server_len(&self, collection: &str) -> usize {
        self.lock().server.documents().len(collection)
    }

    /// Live subscriptions as (server, cache).
    pub fn watcher_counts(&self) -> (usize, usize) {
        let mut state = self.lock();
        let server = state.server.watcher_count();
        (server, state.cache.watcher_count())
    }

    /// Records the call, runs the hook, and checks injected failures.
    fn admit(&self, call: Call, target: Option<(&str, &str)>) -> StoreResult<()> {
        self.lock().calls.push(call.clone());

        let hook_error = {
            let hook = self.hook.lock().unwrap_or_else(|e| e.into_inner());
            hook.as_ref().and_then(|h| h(&call))
        };
        if let Some(error) = hook_error {
            return Err(error);
        }

        let mut state = self.lock();
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        if !state.reachable {
            return Err(StoreError::Unavailable("server unreachable".to_string()));
        }
        if let Some((collection, id)) = target {
            if state.rejected.contains(&(collection.to_string(), id.to_string())) {
                return Err(StoreError::Rejected(format!(
                    "write to {collection}/{id} refused"
                )));
            }
        }
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    fn create_document<'a>(
        &'a self,
        collection: &'a str,
        data: Document,
    ) -> BoxFuture<'a, StoreResult<String>> {
        Box::pin(async move {
            let call = Call::Create {
                collection: collection.to_string(),
            };
            self.admit(call, None)?;

            let mut state = self.lock();
            let id = state.server.create(collection, data.clone());
            state.cache.set(collection, &id, data, false);
            Ok(id)
        })
    }

    fn set_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        data: Document,
        merge: bool,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let call = Call::Set {
                collection: collection.to_string(),
                id: id.to_string(),
                merge,
            };
            self.admit(call, Some((collection, id)))?;

            let mut state = self.lock();
            state.server.set(collection, id, data.clone(), merge);
            state.cache.set(collection, id, data, merge);
            Ok(())
        })
    }

    fn delete_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let call = Call::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            };
            self.admit(call, Some((collection, id)))?;

            let mut state = self.lock();
            state.server.delete(collection, id);
            state.cache.delete(collection, id);
            Ok(())
        })
    }

    fn subscribe(&self, collection: &str, query: &Query, source: Source) -> SnapshotStream {
        let mut state = self.lock();
        state.calls.push(Call::Subscribe {
            collection: collection.to_string(),
            source,
        });

        match source {
            Source::Cache => state.cache.watch(collection, query),
            Source::Server if state.reachable => state.server.watch(collection, query),
            Source::Server => {
                let (tx, rx) = mpsc::unbounded_channel::<StoreResult<Snapshot>>();
                let _ = tx.send(Err(StoreError::Unavailable(
                    "server unreachable".to_string(),
                )));
                rx
            }
        }
    }
}
