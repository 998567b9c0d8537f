// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! [`RemoteStore`] backed by a `fleet-remote` server.
//!
//! One connection is opened lazily on first use and shared by every request
//! and subscription. A background task owns the [`Transport`]: it writes
//! outgoing messages and routes replies to waiting requests by request id
//! and snapshots to live queries by subscription id. When the connection
//! drops, pending requests and live queries fail with
//! [`StoreError::Unavailable`] and the next call reconnects.
//!
//! Server snapshots and acknowledged writes are mirrored into a local cache
//! that serves [`Source::Cache`] subscriptions and can be persisted to
//! [`LocalStorage`] so it survives restarts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_core::protocol::{ClientMessage, ServerMessage};
use fleet_core::{Document, DocumentSet, Query};
use tokio::sync::{mpsc, oneshot};

use super::hub::DocumentHub;
use super::storage::LocalStorage;
use super::store::{BoxFuture, RemoteStore, Snapshot, SnapshotStream, Source, StoreError, StoreResult};
use super::transport::{Transport, TransportError, WebSocketTransport};

/// Connection settings for [`WebSocketStore`].
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// URL of the `fleet-remote` server.
    pub url: String,
    /// Give up connecting after this long.
    pub connect_timeout: Duration,
    /// Give up waiting for a write to be answered after this long.
    pub request_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: "ws://127.0.0.1:7890".to_string(),
            connect_timeout: Duration::from_millis(1500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

type TransportFactory = Box<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// Remote document store speaking the `fleet_core::protocol` over WebSocket.
#[derive(Clone)]
pub struct WebSocketStore {
    inner: Arc<Inner>,
}

struct Inner {
    config: RemoteConfig,
    factory: TransportFactory,
    connection: tokio::sync::Mutex<Option<mpsc::UnboundedSender<Command>>>,
    cache: Arc<Cache>,
    next_id: AtomicU64,
}

impl WebSocketStore {
    /// Creates a store that connects with a [`WebSocketTransport`] on first use.
    pub fn connect_lazy(config: RemoteConfig) -> Self {
        Self::with_transport(config, || Box::new(WebSocketTransport::new()))
    }

    /// Creates a store whose connections use transports from `factory`.
    pub fn with_transport(
        config: RemoteConfig,
        factory: impl Fn() -> Box<dyn Transport> + Send + Sync + 'static,
    ) -> Self {
        WebSocketStore {
            inner: Arc::new(Inner {
                config,
                factory: Box::new(factory),
                connection: tokio::sync::Mutex::new(None),
                cache: Arc::new(Cache::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Persists the local cache under `key`, loading what was stored there.
    ///
    /// Unreadable or corrupt cache contents are logged and ignored.
    pub fn with_cache_storage(self, storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        match storage.get_item(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<DocumentSet>(&raw) {
                Ok(docs) => self.inner.cache.hub().load(docs),
                Err(e) => tracing::warn!(%key, error = %e, "ignoring corrupt document cache"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "failed to read document cache"),
        }
        *self.inner.cache.storage.lock().unwrap_or_else(|e| e.into_inner()) = Some((storage, key));
        self
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// Returns true while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.inner
            .connection
            .try_lock()
            .map(|conn| conn.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Returns a cached document.
    pub fn cached_document(&self, collection: &str, id: &str) -> Option<Document> {
        self.inner.cache.hub().documents().get(collection, id).cloned()
    }

    async fn request(&self, build: impl FnOnce(u64) -> ClientMessage) -> StoreResult<ServerMessage> {
        let outgoing = self.inner.connection().await?;
        let msg = build(self.inner.next_id());
        let (reply_tx, reply_rx) = oneshot::channel();
        outgoing
            .send(Command::Request {
                msg,
                reply: reply_tx,
            })
            .map_err(|_| connection_closed())?;

        let timeout = self.inner.config.request_timeout;
        match tokio::time::timeout(timeout, reply_rx).await {
            Err(_) => Err(StoreError::Unavailable(format!(
                "no reply within {}ms",
                timeout.as_millis()
            ))),
            Ok(Err(_)) => Err(connection_closed()),
            Ok(Ok(ServerMessage::Rejected { message, .. })) => Err(StoreError::Rejected(message)),
            Ok(Ok(reply)) => Ok(reply),
        }
    }
}

impl Inner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the command channel of the open connection, connecting first
    /// if there is none.
    async fn connection(&self) -> StoreResult<mpsc::UnboundedSender<Command>> {
        let mut slot = self.connection.lock().await;
        if let Some(tx) = slot.as_ref().filter(|tx| !tx.is_closed()) {
            return Ok(tx.clone());
        }

        let mut transport = (self.factory)();
        transport
            .connect(&self.config.url, self.config.connect_timeout)
            .await?;
        tracing::info!(url = %self.config.url, "connected to remote store");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(transport, rx, Arc::clone(&self.cache)));
        *slot = Some(tx.clone());
        Ok(tx)
    }
}

fn connection_closed() -> StoreError {
    StoreError::Unavailable("connection closed".to_string())
}

fn unexpected(reply: &ServerMessage) -> StoreError {
    StoreError::Invalid(format!("unexpected reply: {reply:?}"))
}

impl RemoteStore for WebSocketStore {
    fn create_document<'a>(
        &'a self,
        collection: &'a str,
        data: Document,
    ) -> BoxFuture<'a, StoreResult<String>> {
        Box::pin(async move {
            let sent = data.clone();
            let reply = self
                .request(|request_id| ClientMessage::create(request_id, collection, sent))
                .await?;
            match reply {
                ServerMessage::Created { id, .. } => {
                    self.inner.cache.apply(|hub| hub.set(collection, &id, data, false));
                    Ok(id)
                }
                other => Err(unexpected(&other)),
            }
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
            let sent = data.clone();
            let reply = self
                .request(|request_id| ClientMessage::set(request_id, collection, id, sent, merge))
                .await?;
            match reply {
                ServerMessage::Ack { .. } => {
                    self.inner.cache.apply(|hub| hub.set(collection, id, data, merge));
                    Ok(())
                }
                other => Err(unexpected(&other)),
            }
        })
    }

    fn delete_document<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let reply = self
                .request(|request_id| ClientMessage::delete(request_id, collection, id))
                .await?;
            match reply {
                ServerMessage::Ack { .. } => {
                    self.inner.cache.apply(|hub| hub.delete(collection, id));
                    Ok(())
                }
                other => Err(unexpected(&other)),
            }
        })
    }

    fn subscribe(&self, collection: &str, query: &Query, source: Source) -> SnapshotStream {
        if source == Source::Cache {
            return self.inner.cache.hub().watch(collection, query);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let query = query.clone();
        tokio::spawn(async move {
            let outgoing = match inner.connection().await {
                Ok(outgoing) => outgoing,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };
            let subscription_id = inner.next_id();
            drop(inner);

            let command = Command::Subscribe {
                subscription_id,
                collection,
                query,
                tx: tx.clone(),
            };
            if outgoing.send(command).is_err() {
                let _ = tx.send(Err(connection_closed()));
                return;
            }

            tokio::select! {
                _ = tx.closed() => {
                    let _ = outgoing.send(Command::Unsubscribe { subscription_id });
                }
                _ = outgoing.closed() => {}
            }
        });
        rx
    }
}

/// Local mirror of server documents.
struct Cache {
    hub: Mutex<DocumentHub>,
    storage: Mutex<Option<(Arc<dyn LocalStorage>, String)>>,
}

impl Cache {
    fn new() -> Self {
        Cache {
            hub: Mutex::new(DocumentHub::new(true)),
            storage: Mutex::new(None),
        }
    }

    fn hub(&self) -> std::sync::MutexGuard<'_, DocumentHub> {
        self.hub.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies a change and persists the result.
    fn apply(&self, change: impl FnOnce(&mut DocumentHub)) {
        let json = {
            let mut hub = self.hub();
            change(&mut hub);
            serde_json::to_string(hub.documents())
        };

        let slot = self.storage.lock().unwrap_or_else(|e| e.into_inner());
        let Some((storage, key)) = slot.as_ref() else {
            return;
        };
        let result = json
            .map_err(|e| e.to_string())
            .and_then(|json| storage.set_item(key, &json).map_err(|e| e.to_string()));
        if let Err(error) = result {
            tracing::warn!(%key, %error, "failed to persist document cache");
        }
    }
}

enum Command {
    Request {
        msg: ClientMessage,
        reply: oneshot::Sender<ServerMessage>,
    },
    Subscribe {
        subscription_id: u64,
        collection: String,
        query: Query,
        tx: mpsc::UnboundedSender<StoreResult<Snapshot>>,
    },
    Unsubscribe {
        subscription_id: u64,
    },
}

struct Subscriber {
    collection: String,
    query: Query,
    tx: mpsc::UnboundedSender<StoreResult<Snapshot>>,
}

enum Event {
    Command(Option<Command>),
    Message(Result<Option<ServerMessage>, TransportError>),
}

/// Owns the transport until the connection ends.
async fn run_connection(
    mut transport: Box<dyn Transport>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cache: Arc<Cache>,
) {
    let mut pending: HashMap<u64, oneshot::Sender<ServerMessage>> = HashMap::new();
    let mut subscribers: HashMap<u64, Subscriber> = HashMap::new();

    let reason = loop {
        let event = tokio::select! {
            command = commands.recv() => Event::Command(command),
            msg = transport.recv() => Event::Message(msg),
        };

        match event {
            Event::Command(None) => {
                let _ = transport.close().await;
                break "store dropped".to_string();
            }
            Event::Command(Some(command)) => {
                let msg = match command {
                    Command::Request { msg, reply } => {
                        pending.retain(|_, waiting| !waiting.is_closed());
                        if let Some(request_id) = msg.request_id() {
                            pending.insert(request_id, reply);
                        }
                        msg
                    }
                    Command::Subscribe {
                        subscription_id,
                        collection,
                        query,
                        tx,
                    } => {
                        let msg = ClientMessage::subscribe(subscription_id, collection.clone(), query.clone());
                        subscribers.insert(
                            subscription_id,
                            Subscriber {
                                collection,
                                query,
                                tx,
                            },
                        );
                        msg
                    }
                    Command::Unsubscribe { subscription_id } => {
                        if subscribers.remove(&subscription_id).is_none() {
                            continue;
                        }
                        ClientMessage::unsubscribe(subscription_id)
                    }
                };
                if let Err(e) = transport.send(msg).await {
                    break e.to_string();
                }
            }
            Event::Message(Ok(Some(msg))) => route(msg, &mut pending, &mut subscribers, &cache),
            Event::Message(Ok(None)) => break "connection closed by server".to_string(),
            Event::Message(Err(e)) => break e.to_string(),
        }
    };

    tracing::info!(%reason, "disconnected from remote store");
    // New calls must reconnect instead of queueing on this connection.
    commands.close();
    drop(pending);
    let error = StoreError::Unavailable(reason);
    for subscriber in subscribers.into_values() {
        let _ = subscriber.tx.send(Err(error.clone()));
    }
}

fn route(
    msg: ServerMessage,
    pending: &mut HashMap<u64, oneshot::Sender<ServerMessage>>,
    subscribers: &mut HashMap<u64, Subscriber>,
    cache: &Cache,
) {
    match msg {
        ServerMessage::Created { request_id, .. }
        | ServerMessage::Ack { request_id }
        | ServerMessage::Rejected { request_id, .. } => {
            if let Some(reply) = pending.remove(&request_id) {
                let _ = reply.send(msg);
            } else {
                tracing::debug!(request_id, "reply for unknown request");
            }
        }
        ServerMessage::Snapshot {
            subscription_id,
            records,
        } => {
            let Some(subscriber) = subscribers.get(&subscription_id) else {
                return;
            };
            cache.apply(|hub| hub.absorb(&subscriber.collection, &subscriber.query, &records));
            // A closed receiver is unsubscribed by its watcher task.
            let _ = subscriber.tx.send(Ok(Snapshot {
                records,
                from_cache: false,
            }));
        }
        ServerMessage::SubscriptionError {
            subscription_id,
            message,
        } => {
            if let Some(subscriber) = subscribers.remove(&subscription_id) {
                let _ = subscriber.tx.send(Err(StoreError::Rejected(message)));
            }
        }
        ServerMessage::Pong { id } => tracing::trace!(id, "pong"),
        ServerMessage::Error { message } => tracing::warn!(%message, "remote store reported an error"),
    }
}
