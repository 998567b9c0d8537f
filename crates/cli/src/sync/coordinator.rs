// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline write coordination.
//!
//! [`OfflineSubmitter`] is the single entry point for writes to one
//! collection. When the network is online it writes directly to the remote
//! store and reports failures to the caller; when offline it queues the
//! write and returns at once.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::SecondsFormat;
use fleet_core::document::{validate_collection_path, validate_document_id};
use fleet_core::id::generate_temp_id;
use fleet_core::{ClockSource, Document, Operation, Record};
use serde_json::Value;

use super::engine::MutationQueue;
use super::network::NetworkMonitor;
use super::store::{RemoteStore, StoreError};

/// Error type for submissions.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The direct write to the remote store failed. Nothing was queued.
    #[error("write failed: {0}")]
    DirectWrite(#[from] StoreError),

    /// The input could not be turned into a valid write.
    #[error(transparent)]
    Invalid(#[from] fleet_core::Error),
}

/// How a submission reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    /// Written to the remote store.
    Direct,
    /// Queued for replay.
    Queued,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Document id. A temporary id for offline creates.
    pub id: String,
    /// The record as written, timestamps included.
    pub record: Record,
    pub path: WritePath,
}

type SuccessCallback = Box<dyn Fn(&Record) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&SubmitError) + Send + Sync>;

/// Decrements the in-flight counter on drop.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Submits writes for one collection, directly or through the queue.
pub struct OfflineSubmitter {
    collection: String,
    store: Arc<dyn RemoteStore>,
    queue: MutationQueue,
    monitor: NetworkMonitor,
    clock: Arc<dyn ClockSource>,
    in_flight: AtomicUsize,
    offline_operation: AtomicBool,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl OfflineSubmitter {
    /// Binds a submitter to `collection`.
    ///
    /// Uses the queue's monitor and clock.
    pub fn new(
        collection: &str,
        store: Arc<dyn RemoteStore>,
        queue: MutationQueue,
    ) -> fleet_core::Result<Self> {
        validate_collection_path(collection)?;
        Ok(OfflineSubmitter {
            collection: collection.to_string(),
            monitor: queue.monitor().clone(),
            clock: queue.clock(),
            store,
            queue,
            in_flight: AtomicUsize::new(0),
            offline_operation: AtomicBool::new(false),
            on_success: None,
            on_error: None,
        })
    }

    /// Called with the written record after every successful submission.
    pub fn on_success(mut self, f: impl Fn(&Record) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called with the error after every failed submission.
    pub fn on_error(mut self, f: impl Fn(&SubmitError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns true while a submission or removal is in progress.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Returns true if the last completed operation was queued.
    pub fn is_offline_operation(&self) -> bool {
        self.offline_operation.load(Ordering::SeqCst)
    }

    /// Creates (no `id`) or updates (`id` given) a document.
    ///
    /// `updatedAt` is stamped on every write and `createdAt` on creates. When
    /// offline, a create is queued under a fresh temporary id and the call
    /// returns immediately.
    pub async fn submit(&self, data: Document, id: Option<&str>) -> Result<Submission, SubmitError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let result = self.write(data, id).await;
        self.finish(result)
    }

    async fn write(&self, mut data: Document, id: Option<&str>) -> Result<Submission, SubmitError> {
        if let Some(id) = id {
            validate_document_id(id)?;
        }
        let now = Value::String(self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true));
        if id.is_none() {
            data.insert("createdAt".to_string(), now.clone());
        }
        data.insert("updatedAt".to_string(), now);

        if self.monitor.is_online() {
            let id = match id {
                Some(id) => {
                    self.store
                        .set_document(&self.collection, id, data.clone(), true)
                        .await?;
                    id.to_string()
                }
                None => self.store.create_document(&self.collection, data.clone()).await?,
            };
            tracing::debug!(collection = %self.collection, %id, "submitted directly");
            self.offline_operation.store(false, Ordering::SeqCst);
            return Ok(Submission {
                record: Record::new(id.clone(), data),
                id,
                path: WritePath::Direct,
            });
        }

        let (operation, id) = match id {
            Some(id) => (Operation::Update, id.to_string()),
            None => (Operation::Create, generate_temp_id(self.clock.now_ms())),
        };
        self.queue
            .enqueue(operation, &self.collection, &id, Some(data.clone()))?;
        tracing::debug!(collection = %self.collection, %id, %operation, "queued while offline");
        self.offline_operation.store(true, Ordering::SeqCst);
        Ok(Submission {
            record: Record::new(id.clone(), data),
            id,
            path: WritePath::Queued,
        })
    }

    /// Deletes a document.
    ///
    /// Returns `Ok(true)` once the delete was applied or queued.
    pub async fn remove(&self, id: &str) -> Result<bool, SubmitError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let result = self.delete(id).await;
        if let Err(e) = &result {
            self.report_error(e);
        }
        result
    }

    async fn delete(&self, id: &str) -> Result<bool, SubmitError> {
        validate_document_id(id)?;
        if self.monitor.is_online() {
            self.store.delete_document(&self.collection, id).await?;
            self.offline_operation.store(false, Ordering::SeqCst);
        } else {
            self.queue
                .enqueue(Operation::Delete, &self.collection, id, None)?;
            self.offline_operation.store(true, Ordering::SeqCst);
        }
        Ok(true)
    }

    fn finish(&self, result: Result<Submission, SubmitError>) -> Result<Submission, SubmitError> {
        match &result {
            Ok(submission) => {
                if let Some(f) = &self.on_success {
                    f(&submission.record);
                }
            }
            Err(e) => self.report_error(e),
        }
        result
    }

    fn report_error(&self, error: &SubmitError) {
        tracing::warn!(collection = %self.collection, %error, "submission failed");
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}
