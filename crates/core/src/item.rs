// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued mutations.
//!
//! Every write made while disconnected is captured as a [`QueueItem`] and
//! replayed later against the remote store. Items are:
//!
//! - Serializable: the whole queue is persisted as one JSON array
//! - Ordered: `seq` grows strictly in enqueue order
//! - Idempotent on replay: creates and updates are applied as
//!   upsert-with-merge keyed by `(collection_path, id)`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{validate_collection_path, validate_document_id, Document};
use crate::error::{Error, Result};

/// The kind of mutation a queue item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Returns true for operations that carry a payload.
    pub fn has_payload(self) -> bool {
        !matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// A pending mutation waiting to be replayed against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Position in the queue; unique and strictly increasing per queue.
    pub seq: u64,
    /// Target document id (a temporary id for offline creates).
    pub id: String,
    /// The mutation to apply.
    pub operation: Operation,
    /// Collection the document lives in.
    pub collection_path: String,
    /// Full payload for creates and updates; absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Document>,
    /// When the item was enqueued.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Failed replay attempts so far.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl QueueItem {
    /// Creates a validated queue item.
    ///
    /// Fails if the path or id is malformed, if a delete carries a payload,
    /// or if a create/update carries none.
    pub fn new(
        seq: u64,
        operation: Operation,
        collection_path: impl Into<String>,
        id: impl Into<String>,
        data: Option<Document>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let item = QueueItem {
            seq,
            id: id.into(),
            operation,
            collection_path: collection_path.into(),
            data,
            timestamp,
            attempts: 0,
        };
        item.validate()?;
        Ok(item)
    }

    /// Checks the item's invariants.
    pub fn validate(&self) -> Result<()> {
        validate_collection_path(&self.collection_path)?;
        validate_document_id(&self.id)?;
        match (self.operation.has_payload(), self.data.is_some()) {
            (false, true) => Err(Error::InvalidItem(format!(
                "delete of '{}' must not carry a payload",
                self.id
            ))),
            (true, false) => Err(Error::InvalidItem(format!(
                "{} of '{}' requires a payload",
                self.operation, self.id
            ))),
            _ => Ok(()),
        }
    }
}

/// A queue item that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    /// The item as it was when it was given up on.
    pub item: QueueItem,
    /// The last replay error.
    pub error: String,
    /// When the item was moved out of the queue.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub failed_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
