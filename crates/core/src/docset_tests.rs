// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::document::to_document;
use crate::query::{FilterOp, QueryConstraint};
use serde_json::{json, Value};

fn doc(value: Value) -> Document {
    to_document(value).unwrap()
}

#[test]
fn insert_new_assigns_unique_ids() {
    let mut set = DocumentSet::new();
    let a = set.insert_new("vehicles", doc(json!({"plate": "A"})));
    let b = set.insert_new("vehicles", doc(json!({"plate": "B"})));

    assert_ne!(a, b);
    assert_eq!(set.len("vehicles"), 2);
    assert_eq!(set.get("vehicles", &a).unwrap()["plate"], json!("A"));
}

#[test]
fn set_with_merge_keeps_other_fields() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({"plate": "A", "status": "idle"})), false);
    set.set("vehicles", "v1", doc(json!({"status": "active"})), true);

    assert_eq!(
        Value::Object(set.get("vehicles", "v1").unwrap().clone()),
        json!({"plate": "A", "status": "active"})
    );
}

#[test]
fn set_without_merge_replaces() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({"plate": "A", "status": "idle"})), false);
    set.set("vehicles", "v1", doc(json!({"status": "active"})), false);

    assert_eq!(Value::Object(set.get("vehicles", "v1").unwrap().clone()), json!({"status": "active"}));
}

#[test]
fn merge_on_missing_document_creates_it() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "temp_1_abcdef", doc(json!({"plate": "A"})), true);
    assert!(set.contains("vehicles", "temp_1_abcdef"));
}

#[test]
fn delete_reports_existence_and_drops_empty_collections() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({})), false);

    assert!(set.delete("vehicles", "v1"));
    assert!(!set.delete("vehicles", "v1"));
    assert!(!set.delete("drivers", "d1"));
    assert!(set.is_empty());
}

#[test]
fn query_evaluates_constraints() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({"status": "active"})), false);
    set.set("vehicles", "v2", doc(json!({"status": "idle"})), false);
    set.set("drivers", "d1", doc(json!({"status": "active"})), false);

    let query = Query::new(vec![QueryConstraint::filter("status", FilterOp::Eq, "active")]).unwrap();
    let records = set.query("vehicles", &query);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "v1");
    assert!(set.query("missing", &Query::all()).is_empty());
}

#[test]
fn upsert_records_keeps_unlisted_documents() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({"n": 1})), false);
    set.upsert_records("vehicles", &[Record::new("v2", doc(json!({"n": 2})))]);

    assert_eq!(set.len("vehicles"), 2);
}

#[test]
fn replace_collection_is_authoritative() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({"n": 1})), false);
    set.replace_collection("vehicles", &[Record::new("v2", doc(json!({"n": 2})))]);

    assert!(!set.contains("vehicles", "v1"));
    assert!(set.contains("vehicles", "v2"));

    set.replace_collection("vehicles", &[]);
    assert!(set.is_empty());
}

#[test]
fn serializes_as_nested_object() {
    let mut set = DocumentSet::new();
    set.set("vehicles", "v1", doc(json!({"plate": "A"})), false);

    let value = serde_json::to_value(&set).unwrap();
    assert_eq!(value, json!({"vehicles": {"v1": {"plate": "A"}}}));

    let back: DocumentSet = serde_json::from_value(value).unwrap();
    assert_eq!(back, set);
    assert_eq!(back.collection_paths().collect::<Vec<_>>(), vec!["vehicles"]);
}
