// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{QueueError, StorageError, SubmitError};

/// All possible errors that can occur in the fleetrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'fleet init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("invalid remote URL '{0}'\n  hint: use ws://host:port or wss://host")]
    InvalidRemoteUrl(String),

    #[error("invalid document JSON: {reason}\n  hint: pass a JSON object, e.g. '{{\"plate\": \"AB-123\"}}'")]
    InvalidJson { reason: String },

    #[error("nothing to watch: the query ended before producing results")]
    WatchEnded,

    #[error(transparent)]
    Core(#[from] fleet_core::Error),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// A specialized Result type for fleetrs operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
