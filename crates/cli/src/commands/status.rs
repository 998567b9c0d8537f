// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::Session;
use crate::cli::OutputFormat;
use crate::error::Result;

/// Connectivity and queue state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StatusReport {
    pub remote_url: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    pub queued: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_queued_at: Option<DateTime<Utc>>,
    pub dead_letters: usize,
}

pub async fn run(output: OutputFormat) -> Result<()> {
    let session = Session::open()?;
    let report = run_impl(&session).await;
    match output {
        OutputFormat::Text => print!("{}", format_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
    }
    Ok(())
}

pub(crate) async fn run_impl(session: &Session) -> StatusReport {
    let network = session.refresh().await;
    let items = session.queue.queue();
    StatusReport {
        remote_url: session.config.effective_remote_url(),
        online: network.is_online,
        connection_type: network.connection_type,
        queued: items.len(),
        oldest_queued_at: items.iter().map(|item| item.timestamp).min(),
        dead_letters: session.queue.dead_letters().len(),
    }
}

pub(crate) fn format_text(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Remote: {}", report.remote_url);
    match (report.online, report.connection_type.as_deref()) {
        (true, Some(kind)) => {
            let _ = writeln!(out, "Network: online ({kind})");
        }
        (true, None) => {
            let _ = writeln!(out, "Network: online");
        }
        (false, _) => {
            let _ = writeln!(out, "Network: offline");
        }
    }
    match report.oldest_queued_at {
        Some(oldest) => {
            let _ = writeln!(
                out,
                "Queued writes: {} (oldest {})",
                report.queued,
                oldest.to_rfc3339_opts(SecondsFormat::Secs, true)
            );
        }
        None => {
            let _ = writeln!(out, "Queued writes: {}", report.queued);
        }
    }
    let _ = writeln!(out, "Dead letters: {}", report.dead_letters);
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
