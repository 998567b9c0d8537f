// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory document collections.
//!
//! [`DocumentSet`] is the plain data structure behind every document holder
//! in the workspace: the canonical state on the server, the server and cache
//! sides of the in-memory store, and the client-side cache of the WebSocket
//! store. It serializes to a nested JSON object so a cache can be persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::document::{merge_into, Document, Record};
use crate::id::generate_document_id;
use crate::query::Query;

/// Documents grouped by collection path, then by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSet {
    collections: BTreeMap<String, BTreeMap<String, Document>>,
}

impl DocumentSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a document.
    pub fn get(&self, collection: &str, id: &str) -> Option<&Document> {
        self.collections.get(collection)?.get(id)
    }

    /// Returns true if the document exists.
    pub fn contains(&self, collection: &str, id: &str) -> bool {
        self.get(collection, id).is_some()
    }

    /// Stores a new document under a freshly generated id and returns the id.
    pub fn insert_new(&mut self, collection: &str, data: Document) -> String {
        let docs = self.collections.entry(collection.to_string()).or_default();
        let mut id = generate_document_id();
        while docs.contains_key(&id) {
            id = generate_document_id();
        }
        docs.insert(id.clone(), data);
        id
    }

    /// Writes a document.
    ///
    /// With `merge`, fields are merged into an existing document (or the
    /// document is created); without it, the document is replaced.
    pub fn set(&mut self, collection: &str, id: &str, data: Document, merge: bool) {
        let docs = self.collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => merge_into(existing, &data),
            _ => {
                docs.insert(id.to_string(), data);
            }
        }
    }

    /// Removes a document. Returns true if it existed.
    pub fn delete(&mut self, collection: &str, id: &str) -> bool {
        let Some(docs) = self.collections.get_mut(collection) else {
            return false;
        };
        let removed = docs.remove(id).is_some();
        if docs.is_empty() {
            self.collections.remove(collection);
        }
        removed
    }

    /// Evaluates a query against one collection.
    pub fn query(&self, collection: &str, query: &Query) -> Vec<Record> {
        let Some(docs) = self.collections.get(collection) else {
            return Vec::new();
        };
        query.apply(docs.iter().map(|(id, fields)| Record::new(id.clone(), fields.clone())))
    }

    /// Stores the given records, replacing documents with the same id.
    ///
    /// Used to refresh a cache from a server snapshot of a constrained query,
    /// where absent documents cannot be assumed deleted.
    pub fn upsert_records(&mut self, collection: &str, records: &[Record]) {
        let docs = self.collections.entry(collection.to_string()).or_default();
        for record in records {
            docs.insert(record.id.clone(), record.fields.clone());
        }
    }

    /// Replaces a whole collection with the given records.
    ///
    /// Used to refresh a cache from a server snapshot of an unconstrained
    /// query, which is authoritative for the collection.
    pub fn replace_collection(&mut self, collection: &str, records: &[Record]) {
        if records.is_empty() {
            self.collections.remove(collection);
            return;
        }
        let docs = records.iter().map(|r| (r.id.clone(), r.fields.clone())).collect();
        self.collections.insert(collection.to_string(), docs);
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Returns true if no collection holds any document.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Collection paths holding at least one document.
    pub fn collection_paths(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "docset_tests.rs"]
mod tests;
