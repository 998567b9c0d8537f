// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use fleet_core::document::to_document;
use fleet_core::{FilterOp, QueryConstraint};
use serde_json::json;
use tempfile::TempDir;

fn doc(value: serde_json::Value) -> Document {
    to_document(value).unwrap()
}

#[tokio::test]
async fn writes_are_visible_to_queries() {
    let temp = TempDir::new().unwrap();
    let state = ServerState::new(temp.path()).unwrap();

    let id = state.create("vehicles", doc(json!({"plate": "AB-1"}))).await.unwrap();
    state
        .set("vehicles", "v2", doc(json!({"plate": "CD-2"})), false)
        .await
        .unwrap();

    let records = state.query("vehicles", &Query::all()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r.id == id));
}

#[tokio::test]
async fn merge_keeps_existing_fields() {
    let temp = TempDir::new().unwrap();
    let state = ServerState::new(temp.path()).unwrap();
    state
        .set("vehicles", "v1", doc(json!({"plate": "AB-1", "status": "idle"})), false)
        .await
        .unwrap();

    state
        .set("vehicles", "v1", doc(json!({"status": "active"})), true)
        .await
        .unwrap();

    assert_eq!(
        state.document("vehicles", "v1").await.unwrap(),
        doc(json!({"plate": "AB-1", "status": "active"}))
    );
}

#[tokio::test]
async fn deleting_a_missing_document_succeeds() {
    let temp = TempDir::new().unwrap();
    let state = ServerState::new(temp.path()).unwrap();

    state.delete("vehicles", "ghost").await.unwrap();

    assert!(state.document("vehicles", "ghost").await.is_none());
}

#[tokio::test]
async fn log_is_replayed_on_start() {
    let temp = TempDir::new().unwrap();
    let id = {
        let state = ServerState::new(temp.path()).unwrap();
        let id = state.create("vehicles", doc(json!({"plate": "AB-1"}))).await.unwrap();
        state
            .set("vehicles", "v2", doc(json!({"plate": "CD-2"})), false)
            .await
            .unwrap();
        state.delete("vehicles", "v2").await.unwrap();
        id
    };

    let state = ServerState::new(temp.path()).unwrap();

    assert_eq!(
        state.document("vehicles", &id).await.unwrap(),
        doc(json!({"plate": "AB-1"}))
    );
    assert!(state.document("vehicles", "v2").await.is_none());
}

#[tokio::test]
async fn torn_log_line_is_skipped() {
    let temp = TempDir::new().unwrap();
    {
        let state = ServerState::new(temp.path()).unwrap();
        state
            .set("vehicles", "v1", doc(json!({"plate": "AB-1"})), false)
            .await
            .unwrap();
    }
    let log = temp.path().join("writes.jsonl");
    let mut content = std::fs::read_to_string(&log).unwrap();
    content.push_str("{\"op\":\"set\",\"collec");
    std::fs::write(&log, content).unwrap();

    let state = ServerState::new(temp.path()).unwrap();

    assert!(state.document("vehicles", "v1").await.is_some());
}

#[tokio::test]
async fn invalid_writes_are_refused() {
    let temp = TempDir::new().unwrap();
    let state = ServerState::new(temp.path()).unwrap();

    assert!(state.create("fleets/f1", Document::new()).await.is_err());
    assert!(state.set("vehicles", "a/b", Document::new(), false).await.is_err());
    assert!(state.delete("", "v1").await.is_err());
    assert!(!temp.path().join("writes.jsonl").exists());
}

#[tokio::test]
async fn unvalidated_query_is_refused() {
    let temp = TempDir::new().unwrap();
    let state = ServerState::new(temp.path()).unwrap();
    let zero_limit: Query = serde_json::from_value(json!([{"kind": "limit", "n": 0}])).unwrap();
    let filtered = Query::new(vec![QueryConstraint::filter("rank", FilterOp::Gt, 1)]).unwrap();

    assert!(state.query("vehicles", &zero_limit).await.is_err());
    assert!(state.query("vehicles", &filtered).await.is_ok());
}

#[tokio::test]
async fn writes_notify_subscribers() {
    let temp = TempDir::new().unwrap();
    let state = ServerState::new(temp.path()).unwrap();
    let mut changes = state.subscribe();

    state.delete("vehicles", "v1").await.unwrap();

    assert_eq!(changes.recv().await.unwrap(), "vehicles");
}
