// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fleet-core: Shared library for the fleet offline sync engine.
//!
//! This crate provides the data model shared by the `fleet` client library
//! and the `fleet-remote` document server: documents and records, queued
//! mutations, network status, validated query constraints, identifier
//! generation, and the WebSocket wire protocol. It has no async runtime.

pub mod clock;
pub mod docset;
pub mod document;
pub mod error;
pub mod id;
pub mod item;
pub mod jsonl;
pub mod network;
pub mod protocol;
pub mod query;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use docset::DocumentSet;
pub use document::{Document, Record};
pub use error::{Error, Result};
pub use item::{DeadLetter, Operation, QueueItem};
pub use network::NetworkStatus;
pub use query::{Direction, FilterOp, Query, QueryConstraint};
