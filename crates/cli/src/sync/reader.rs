// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cache-aware live reads.
//!
//! A [`LiveQuery`] keeps one subscription open on the remote store and
//! publishes its results as a [`ReadState`]. The source is picked per
//! subscription:
//! - cache when the caller asked for cache-only reads or the network is offline
//! - server otherwise, falling back to cache if the server is unreachable
//!
//! Unless reads are cache-only, every connectivity transition re-establishes
//! the subscription with the newly selected source.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_core::clock::from_millis;
use fleet_core::document::validate_collection_path;
use fleet_core::{ClockSource, Query, QueryConstraint, Record};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::network::NetworkMonitor;
use super::store::{RemoteStore, Snapshot, SnapshotStream, Source, StoreError};

/// Latest results of a live query, with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadState {
    pub data: Vec<Record>,
    /// True until the first result or error arrives for the current query.
    pub is_loading: bool,
    /// Last subscription error. Cleared by the next result.
    pub error: Option<String>,
    pub is_offline: bool,
    /// True if `data` came from the local cache.
    pub from_cache: bool,
    /// When `data` was last replaced. Strictly increasing.
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl ReadState {
    fn loading(is_offline: bool) -> Self {
        ReadState {
            data: Vec::new(),
            is_loading: true,
            error: None,
            is_offline,
            from_cache: false,
            last_updated_at: None,
        }
    }
}

/// Options for [`CacheAwareReader::watch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Never contact the server.
    pub cache_only: bool,
}

/// Opens live queries.
#[derive(Clone)]
pub struct CacheAwareReader {
    store: Arc<dyn RemoteStore>,
    monitor: NetworkMonitor,
    clock: Arc<dyn ClockSource>,
}

impl CacheAwareReader {
    pub fn new(store: Arc<dyn RemoteStore>, monitor: NetworkMonitor, clock: Arc<dyn ClockSource>) -> Self {
        CacheAwareReader {
            store,
            monitor,
            clock,
        }
    }

    /// Starts a live query.
    ///
    /// The collection path and constraints are validated first; on error
    /// nothing is subscribed. Must be called within a tokio runtime.
    pub fn watch(
        &self,
        collection: &str,
        constraints: Vec<QueryConstraint>,
        options: ReadOptions,
    ) -> fleet_core::Result<LiveQuery> {
        validate_collection_path(collection)?;
        let query = Query::new(constraints)?;

        let (state_tx, state_rx) = watch::channel(ReadState::loading(!self.monitor.is_online()));
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let task = Subscription {
            store: Arc::clone(&self.store),
            monitor: self.monitor.clone(),
            clock: Arc::clone(&self.clock),
            options,
            state: state_tx,
            last_ms: None,
        };
        let task = tokio::spawn(task.run(collection.to_string(), query, control_rx));

        Ok(LiveQuery {
            state: state_rx,
            control: control_tx,
            task,
        })
    }
}

enum Control {
    SetQuery { collection: String, query: Query },
}

/// Handle on a running live query. Dropping it ends the subscription.
pub struct LiveQuery {
    state: watch::Receiver<ReadState>,
    control: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

impl LiveQuery {
    /// Current state.
    pub fn state(&self) -> ReadState {
        self.state.borrow().clone()
    }

    /// Another receiver for the state.
    pub fn subscribe(&self) -> watch::Receiver<ReadState> {
        self.state.clone()
    }

    /// Waits for the next state change. Returns `None` once the query ended.
    pub async fn changed(&mut self) -> Option<ReadState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Waits until the state satisfies `pred`.
    pub async fn wait_for(&mut self, pred: impl FnMut(&ReadState) -> bool) -> Option<ReadState> {
        self.state.wait_for(pred).await.ok().map(|state| state.clone())
    }

    /// Replaces the query. The current subscription is torn down and a new
    /// one established; invalid input leaves the current one running.
    pub fn set_query(&self, collection: &str, constraints: Vec<QueryConstraint>) -> fleet_core::Result<()> {
        validate_collection_path(collection)?;
        let query = Query::new(constraints)?;
        let _ = self.control.send(Control::SetQuery {
            collection: collection.to_string(),
            query,
        });
        Ok(())
    }

    /// Ends the subscription.
    pub fn detach(self) {}
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Subscription {
    store: Arc<dyn RemoteStore>,
    monitor: NetworkMonitor,
    clock: Arc<dyn ClockSource>,
    options: ReadOptions,
    state: watch::Sender<ReadState>,
    last_ms: Option<u64>,
}

impl Subscription {
    fn select_source(&self, online: bool) -> Source {
        if self.options.cache_only || !online {
            Source::Cache
        } else {
            Source::Server
        }
    }

    async fn run(
        mut self,
        mut collection: String,
        mut query: Query,
        mut control: mpsc::UnboundedReceiver<Control>,
    ) {
        let mut network = self.monitor.subscribe();

        'subscribe: loop {
            let mut online = network.borrow_and_update().is_online;
            let mut source = self.select_source(online);
            self.state.send_modify(|s| {
                s.is_loading = true;
                s.is_offline = !online;
            });
            tracing::debug!(%collection, %query, %source, "subscribing");
            let mut stream: SnapshotStream = self.store.subscribe(&collection, &query, source);
            let mut stream_open = true;

            loop {
                tokio::select! {
                    item = stream.recv(), if stream_open => match item {
                        Some(Ok(snapshot)) => self.publish(snapshot, online),
                        Some(Err(StoreError::Unavailable(reason))) if source == Source::Server => {
                            tracing::debug!(%collection, %reason, "server unavailable, reading from cache");
                            source = Source::Cache;
                            stream = self.store.subscribe(&collection, &query, source);
                        }
                        Some(Err(error)) => self.fail(&error),
                        None => stream_open = false,
                    },
                    changed = network.changed() => {
                        if changed.is_err() {
                            break 'subscribe;
                        }
                        let now_online = network.borrow_and_update().is_online;
                        if now_online == online {
                            continue;
                        }
                        if self.options.cache_only {
                            online = now_online;
                            self.state.send_modify(|s| s.is_offline = !now_online);
                            continue;
                        }
                        continue 'subscribe;
                    }
                    command = control.recv() => match command {
                        Some(Control::SetQuery { collection: c, query: q }) => {
                            collection = c;
                            query = q;
                            continue 'subscribe;
                        }
                        None => break 'subscribe,
                    },
                }
            }
        }
    }

    fn publish(&mut self, snapshot: Snapshot, online: bool) {
        let now = self.clock.now_ms();
        let ms = match self.last_ms {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_ms = Some(ms);

        self.state.send_modify(|s| {
            s.data = snapshot.records;
            s.from_cache = snapshot.from_cache;
            s.is_offline = !online;
            s.is_loading = false;
            s.error = None;
            s.last_updated_at = Some(from_millis(ms));
        });
    }

    fn fail(&self, error: &StoreError) {
        tracing::warn!(%error, "subscription error");
        self.state.send_modify(|s| {
            s.error = Some(error.to_string());
            s.is_loading = false;
        });
    }
}
