// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_core::protocol::{ClientMessage, ServerMessage};
use fleet_core::{Document, ManualClock};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use super::engine::{MutationQueue, QueueEvent, QueueOptions};
use super::memory::MemoryStore;
use super::network::{ConnectivityProbe, NetworkMonitor, ProbeReport};
use super::queue::PersistentQueueStore;
use super::storage::MemoryStorage;
use super::transport::{Transport, TransportError, TransportFuture};

/// Epoch milliseconds used as "now" by test clocks.
pub const T0: u64 = 1_700_000_000_000;

pub const VEHICLES: &str = "vehicles";

/// Builds a document from a JSON object literal.
pub fn doc(value: Value) -> Document {
    fleet_core::document::to_document(value).unwrap()
}

/// Everything a queue test needs, wired together.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub monitor: NetworkMonitor,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub queue: MutationQueue,
}

impl Harness {
    pub fn new(online: bool) -> Self {
        Self::with_options(online, QueueOptions::default())
    }

    pub fn with_options(online: bool, options: QueueOptions) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        Self::with_storage(online, options, storage)
    }

    /// Opens a queue over existing storage contents.
    pub fn with_storage(online: bool, options: QueueOptions, storage: Arc<MemoryStorage>) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let monitor = NetworkMonitor::with_clock(online, clock.clone());
        let store = Arc::new(MemoryStore::new());
        let persistence = PersistentQueueStore::new(storage.clone(), PersistentQueueStore::DEFAULT_KEY);
        let queue = MutationQueue::open(
            store.clone(),
            monitor.clone(),
            persistence,
            QueueOptions {
                clock: Some(clock.clone()),
                ..options
            },
        );
        Harness {
            store,
            monitor,
            storage,
            clock,
            queue,
        }
    }

    /// Persisted queue blob.
    pub fn persisted(&self) -> Value {
        use super::storage::LocalStorage;
        let raw = self
            .storage
            .get_item(PersistentQueueStore::DEFAULT_KEY)
            .unwrap()
            .unwrap_or_else(|| "[]".to_string());
        serde_json::from_str(&raw).unwrap()
    }

    /// Ids of the queued items, in order.
    pub fn queued_ids(&self) -> Vec<String> {
        self.queue.queue().into_iter().map(|item| item.id).collect()
    }
}

/// Waits for the first event matching `pred`, failing after five seconds.
pub async fn next_event(
    rx: &mut broadcast::Receiver<QueueEvent>,
    pred: impl Fn(&QueueEvent) -> bool,
) -> QueueEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

/// Probe returning scripted reports in order, then repeating the last one.
pub struct ScriptedProbe {
    reports: Mutex<Vec<ProbeReport>>,
}

impl ScriptedProbe {
    pub fn new(mut reports: Vec<ProbeReport>) -> Self {
        reports.reverse();
        ScriptedProbe {
            reports: Mutex::new(reports),
        }
    }
}

impl ConnectivityProbe for ScriptedProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = ProbeReport> + Send + '_>> {
        let mut reports = self.reports.lock().unwrap();
        let report = if reports.len() > 1 {
            reports.pop().unwrap()
        } else {
            reports.last().cloned().unwrap_or_default()
        };
        Box::pin(async move { report })
    }
}

/// In-process stand-in for a network of `fleet-remote` servers.
///
/// Every successful [`MockTransport::connect`] hands the server end of the
/// connection to the test through [`MockNetwork::accept`].
pub struct MockNetwork {
    peers: mpsc::UnboundedSender<MockPeer>,
    accepted: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockPeer>>,
    refuse: Arc<std::sync::atomic::AtomicBool>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        let (peers, accepted) = mpsc::unbounded_channel();
        Arc::new(MockNetwork {
            peers,
            accepted: tokio::sync::Mutex::new(accepted),
            refuse: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        })
    }

    /// Makes subsequent connects fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, std::sync::atomic::Ordering::SeqCst);
    }

    /// A transport that connects into this network.
    pub fn transport(&self) -> MockTransport {
        MockTransport {
            peers: self.peers.clone(),
            refuse: Arc::clone(&self.refuse),
            link: None,
        }
    }

    /// Waits for the next accepted connection, failing after five seconds.
    pub async fn accept(&self) -> MockPeer {
        tokio::time::timeout(Duration::from_secs(5), self.incoming())
            .await
            .unwrap()
            .unwrap()
    }

    /// Waits for the next accepted connection.
    pub async fn incoming(&self) -> Option<MockPeer> {
        self.accepted.lock().await.recv().await
    }
}

struct Link {
    to_server: mpsc::UnboundedSender<ClientMessage>,
    from_server: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Client end of an in-process connection.
pub struct MockTransport {
    peers: mpsc::UnboundedSender<MockPeer>,
    refuse: Arc<std::sync::atomic::AtomicBool>,
    link: Option<Link>,
}

impl Transport for MockTransport {
    fn connect<'a>(&'a mut self, _url: &'a str, _timeout: Duration) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            if self.refuse.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(TransportError::ConnectionFailed("connection refused".into()));
            }
            let (to_server, from_client) = mpsc::unbounded_channel();
            let (to_client, from_server) = mpsc::unbounded_channel();
            self.peers
                .send(MockPeer {
                    from_client,
                    to_client,
                })
                .map_err(|_| TransportError::ConnectionFailed("network gone".into()))?;
            self.link = Some(Link {
                to_server,
                from_server,
            });
            Ok(())
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.link = None;
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let link = self.link.as_ref().ok_or(TransportError::ConnectionClosed)?;
            link.to_server
                .send(msg)
                .map_err(|_| TransportError::SendFailed("peer gone".into()))
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>> {
        Box::pin(async move {
            let link = self.link.as_mut().ok_or(TransportError::ConnectionClosed)?;
            Ok(link.from_server.recv().await)
        })
    }
}

/// Server end of an in-process connection. Dropping it hangs up.
pub struct MockPeer {
    from_client: mpsc::UnboundedReceiver<ClientMessage>,
    to_client: mpsc::UnboundedSender<ServerMessage>,
}

impl MockPeer {
    /// Next message from the client, failing after five seconds.
    pub async fn recv(&mut self) -> ClientMessage {
        tokio::time::timeout(Duration::from_secs(5), self.from_client.recv())
            .await
            .unwrap()
            .unwrap()
    }

    /// Returns `None` once the client closed the connection.
    pub async fn closed(&mut self) -> Option<ClientMessage> {
        tokio::time::timeout(Duration::from_secs(5), self.from_client.recv())
            .await
            .unwrap()
    }

    /// Next message from the client. `None` once it closed the connection.
    pub async fn next(&mut self) -> Option<ClientMessage> {
        self.from_client.recv().await
    }

    pub fn send(&self, msg: ServerMessage) {
        self.to_client.send(msg).unwrap();
    }

    /// Sends unless the client is gone.
    pub fn try_send(&self, msg: ServerMessage) -> bool {
        self.to_client.send(msg).is_ok()
    }
}
