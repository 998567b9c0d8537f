// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the fleet-remote server binary, driven through the
//! `fleet` client library.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use fleet_core::document::to_document;
use fleet_core::{Operation, Query};
use fleetrs::sync::{
    MemoryStorage, MutationQueue, NetworkMonitor, PersistentQueueStore, QueueOptions,
    RemoteConfig, RemoteStore, Source, StoreError, WebSocketStore,
};
use serde_json::json;

/// Helper to spawn a server process and clean it up on drop.
struct ServerProcess {
    child: Child,
    port: u16,
}

impl ServerProcess {
    fn spawn(data: &Path, port: u16) -> Self {
        let child = Command::new(env!("CARGO_BIN_EXE_fleet-remote"))
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--data")
            .arg(data)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        ServerProcess { child, port }
    }

    fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// A store pointed at this server once it accepts connections.
    async fn store(&self) -> WebSocketStore {
        // CI runners can be slow, so retry generously
        for _ in 0..40 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        WebSocketStore::connect_lazy(RemoteConfig {
            url: self.url(),
            ..RemoteConfig::default()
        })
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A port unlikely to collide with parallel test binaries.
fn test_port(offset: u16) -> u16 {
    49152 + (std::process::id() % 1000) as u16 * 4 + offset
}

#[tokio::test]
async fn writes_and_live_queries_over_the_wire() {
    let temp = tempfile::tempdir().unwrap();
    let server = ServerProcess::spawn(temp.path(), test_port(0));
    let store = server.store().await;

    let mut live = store.subscribe("vehicles", &Query::all(), Source::Server);
    let initial = tokio::time::timeout(Duration::from_secs(5), live.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(initial.records.is_empty());
    assert!(!initial.from_cache);

    let data = to_document(json!({"plate": "AB-1"})).unwrap();
    let id = store.create_document("vehicles", data).await.unwrap();

    let update = tokio::time::timeout(Duration::from_secs(5), live.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(update.records.len(), 1);
    assert_eq!(update.records[0].id, id);
}

#[tokio::test]
async fn documents_survive_a_restart() {
    let temp = tempfile::tempdir().unwrap();
    let port = test_port(1);
    let id = {
        let server = ServerProcess::spawn(temp.path(), port);
        let store = server.store().await;
        let data = to_document(json!({"plate": "AB-1"})).unwrap();
        store.create_document("vehicles", data).await.unwrap()
    };

    let server = ServerProcess::spawn(temp.path(), port);
    let store = server.store().await;
    let mut live = store.subscribe("vehicles", &Query::all(), Source::Server);
    let snapshot = tokio::time::timeout(Duration::from_secs(5), live.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].id, id);
    assert_eq!(snapshot.records[0].fields["plate"], "AB-1");
}

#[tokio::test]
async fn invalid_writes_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let server = ServerProcess::spawn(temp.path(), test_port(2));
    let store = server.store().await;

    let result = store
        .set_document("fleets/f1", "v1", Default::default(), false)
        .await;

    assert!(matches!(result, Err(StoreError::Rejected(_))));
}

#[tokio::test]
async fn queued_writes_replay_against_the_server() {
    let temp = tempfile::tempdir().unwrap();
    let server = ServerProcess::spawn(temp.path(), test_port(3));
    let store = Arc::new(server.store().await);
    let monitor = NetworkMonitor::new(false);
    let queue = MutationQueue::open(
        store.clone(),
        monitor.clone(),
        PersistentQueueStore::new(Arc::new(MemoryStorage::new()), "queue"),
        QueueOptions::default(),
    );
    let data = to_document(json!({"status": "idle"})).unwrap();
    queue
        .enqueue(Operation::Update, "vehicles", "v1", Some(data))
        .unwrap();
    queue
        .enqueue(Operation::Delete, "vehicles", "v2", None)
        .unwrap();

    monitor.set_online(true);
    let report = queue.process_queue().await;

    assert_eq!(report.applied, 2);
    assert_eq!(queue.queue_size(), 0);
    assert_eq!(
        store.cached_document("vehicles", "v1").unwrap()["status"],
        "idle"
    );
}
