// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `fleet submit` and `fleet remove`.
//!
//! Both probe the remote once, then write directly when it answers and queue
//! the write otherwise.

use std::sync::Arc;

use fleet_core::document::to_document;
use fleet_core::Document;
use serde_json::Value;

use super::Session;
use crate::error::{Error, Result};
use crate::sync::{OfflineSubmitter, Submission, WritePath};

pub async fn run(collection: String, data: String, id: Option<String>) -> Result<()> {
    let session = Session::open()?;
    let submission = run_impl(&session, &collection, &data, id.as_deref()).await?;
    println!(
        "{}",
        describe_submission(
            &collection,
            id.is_none(),
            &submission,
            session.queue.queue_size()
        )
    );
    Ok(())
}

pub(crate) async fn run_impl(
    session: &Session,
    collection: &str,
    data: &str,
    id: Option<&str>,
) -> Result<Submission> {
    let document = parse_document(data)?;
    let submitter = submitter(session, collection)?;
    session.refresh().await;
    Ok(submitter.submit(document, id).await?)
}

pub async fn remove(collection: String, id: String) -> Result<()> {
    let session = Session::open()?;
    let path = remove_impl(&session, &collection, &id).await?;
    match path {
        WritePath::Direct => println!("Deleted {collection}/{id}"),
        WritePath::Queued => println!(
            "Queued delete of {collection}/{id} (offline, {} pending)",
            session.queue.queue_size()
        ),
    }
    Ok(())
}

pub(crate) async fn remove_impl(session: &Session, collection: &str, id: &str) -> Result<WritePath> {
    let submitter = submitter(session, collection)?;
    session.refresh().await;
    submitter.remove(id).await?;
    Ok(if submitter.is_offline_operation() {
        WritePath::Queued
    } else {
        WritePath::Direct
    })
}

fn submitter(session: &Session, collection: &str) -> Result<OfflineSubmitter> {
    Ok(OfflineSubmitter::new(
        collection,
        Arc::clone(&session.store),
        session.queue.clone(),
    )?)
}

/// Parses command-line JSON into a document.
pub(crate) fn parse_document(data: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(data).map_err(|e| Error::InvalidJson {
        reason: e.to_string(),
    })?;
    Ok(to_document(value)?)
}

pub(crate) fn describe_submission(
    collection: &str,
    created: bool,
    submission: &Submission,
    pending: usize,
) -> String {
    let id = &submission.id;
    match (submission.path, created) {
        (WritePath::Direct, true) => format!("Created {collection}/{id}"),
        (WritePath::Direct, false) => format!("Updated {collection}/{id}"),
        (WritePath::Queued, true) => {
            format!("Queued create of {collection}/{id} (offline, {pending} pending)")
        }
        (WritePath::Queued, false) => {
            format!("Queued update of {collection}/{id} (offline, {pending} pending)")
        }
    }
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
