// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for fleet-core operations.

use thiserror::Error;

/// All possible errors that can occur in fleet-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid collection path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid document id '{0}'\n  hint: ids must be non-empty and must not contain '/'")]
    InvalidDocumentId(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid queue item: {0}")]
    InvalidItem(String),

    #[error("document must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for fleet-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
