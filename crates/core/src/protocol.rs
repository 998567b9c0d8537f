// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between document-store clients and the server.
//!
//! Every message is a JSON object tagged by `type`:
//! - Writes (`create`, `set`, `delete`) carry a client-chosen `request_id`
//!   and are answered by `created`, `ack` or `rejected`.
//! - Subscriptions carry a client-chosen `subscription_id`; the server sends
//!   a `snapshot` immediately and again after every write to the collection.

use serde::{Deserialize, Serialize};

use crate::document::{Document, Record};
use crate::query::Query;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a document with a server-assigned id.
    Create {
        request_id: u64,
        collection: String,
        data: Document,
    },

    /// Write a document under a known id.
    Set {
        request_id: u64,
        collection: String,
        id: String,
        data: Document,
        /// Merge into an existing document instead of replacing it.
        #[serde(default)]
        merge: bool,
    },

    /// Delete a document. Deleting a missing document is acknowledged.
    Delete {
        request_id: u64,
        collection: String,
        id: String,
    },

    /// Start a live query.
    Subscribe {
        subscription_id: u64,
        collection: String,
        #[serde(default)]
        query: Query,
    },

    /// Stop a live query.
    Unsubscribe { subscription_id: u64 },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A `create` was applied.
    Created { request_id: u64, id: String },

    /// A `set` or `delete` was applied.
    Ack { request_id: u64 },

    /// Current results of a live query.
    Snapshot {
        subscription_id: u64,
        records: Vec<Record>,
    },

    /// A live query could not be started. No further snapshots follow.
    SubscriptionError {
        subscription_id: u64,
        message: String,
    },

    /// A write was refused and will not succeed if retried unchanged.
    Rejected { request_id: u64, message: String },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error not tied to a request, e.g. an unparsable message.
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates a Create message.
    pub fn create(request_id: u64, collection: impl Into<String>, data: Document) -> Self {
        ClientMessage::Create {
            request_id,
            collection: collection.into(),
            data,
        }
    }

    /// Creates a Set message.
    pub fn set(
        request_id: u64,
        collection: impl Into<String>,
        id: impl Into<String>,
        data: Document,
        merge: bool,
    ) -> Self {
        ClientMessage::Set {
            request_id,
            collection: collection.into(),
            id: id.into(),
            data,
            merge,
        }
    }

    /// Creates a Delete message.
    pub fn delete(request_id: u64, collection: impl Into<String>, id: impl Into<String>) -> Self {
        ClientMessage::Delete {
            request_id,
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a Subscribe message.
    pub fn subscribe(subscription_id: u64, collection: impl Into<String>, query: Query) -> Self {
        ClientMessage::Subscribe {
            subscription_id,
            collection: collection.into(),
            query,
        }
    }

    /// Creates an Unsubscribe message.
    pub fn unsubscribe(subscription_id: u64) -> Self {
        ClientMessage::Unsubscribe { subscription_id }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Returns the request id of a write message.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ClientMessage::Create { request_id, .. }
            | ClientMessage::Set { request_id, .. }
            | ClientMessage::Delete { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates a Created message.
    pub fn created(request_id: u64, id: impl Into<String>) -> Self {
        ServerMessage::Created {
            request_id,
            id: id.into(),
        }
    }

    /// Creates an Ack message.
    pub fn ack(request_id: u64) -> Self {
        ServerMessage::Ack { request_id }
    }

    /// Creates a Snapshot message.
    pub fn snapshot(subscription_id: u64, records: Vec<Record>) -> Self {
        ServerMessage::Snapshot {
            subscription_id,
            records,
        }
    }

    /// Creates a SubscriptionError message.
    pub fn subscription_error(subscription_id: u64, message: impl Into<String>) -> Self {
        ServerMessage::SubscriptionError {
            subscription_id,
            message: message.into(),
        }
    }

    /// Creates a Rejected message.
    pub fn rejected(request_id: u64, message: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            request_id,
            message: message.into(),
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
