// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Documents, records, and path validation.
//!
//! A [`Document`] is the stored field set of one remote document. A
//! [`Record`] is a document paired with its identifier, which is what every
//! read hands back to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// The stored fields of one document.
pub type Document = Map<String, Value>;

/// A document together with its identifier.
///
/// Serializes flat: the document fields plus an `id` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Document identifier within its collection.
    pub id: String,
    /// Stored fields.
    #[serde(flatten)]
    pub fields: Document,
}

impl Record {
    /// Creates a record from an id and its fields.
    ///
    /// A stray `id` member inside `fields` is dropped so the flat form stays
    /// unambiguous.
    pub fn new(id: impl Into<String>, mut fields: Document) -> Self {
        fields.remove("id");
        Record { id: id.into(), fields }
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return None;
        }
        self.fields.get(field)
    }
}

/// Converts an arbitrary JSON value into a document.
///
/// Only JSON objects are documents.
pub fn to_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(Error::NotAnObject("null".into())),
        Value::Bool(_) => Err(Error::NotAnObject("a boolean".into())),
        Value::Number(_) => Err(Error::NotAnObject("a number".into())),
        Value::String(_) => Err(Error::NotAnObject("a string".into())),
        Value::Array(_) => Err(Error::NotAnObject("an array".into())),
    }
}

/// Applies `incoming` on top of `existing` with upsert-with-merge semantics.
///
/// Top-level fields present in `incoming` replace those in `existing`;
/// fields absent from `incoming` are left untouched.
pub fn merge_into(existing: &mut Document, incoming: &Document) {
    for (key, value) in incoming {
        existing.insert(key.clone(), value.clone());
    }
}

/// Validates a collection path.
///
/// A collection path is one or more `/`-separated non-empty segments with an
/// odd segment count (`vehicles`, `depots/d1/bays`). An even count would
/// address a document rather than a collection.
pub fn validate_collection_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidPath { path: path.to_string(), reason: reason.to_string() };

    if path.trim().is_empty() {
        return Err(invalid("path is empty"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(invalid("path contains an empty segment"));
    }
    if segments.len() % 2 == 0 {
        return Err(invalid("path points at a document, not a collection"));
    }
    Ok(())
}

/// Validates a document identifier.
pub fn validate_document_id(id: &str) -> Result<()> {
    if id.trim().is_empty() || id.contains('/') {
        return Err(Error::InvalidDocumentId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
