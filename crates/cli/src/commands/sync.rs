// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::Session;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::ReplayReport;

pub async fn run(output: OutputFormat) -> Result<()> {
    let session = Session::open()?;
    let report = run_impl(&session).await;
    let remaining = session.queue.queue_size();
    match output {
        OutputFormat::Text => {
            println!("Sync {report}");
            if remaining > 0 {
                println!("{remaining} write(s) still queued");
            }
        }
        OutputFormat::Json => println!("{}", report_json(&report, remaining)),
    }
    Ok(())
}

/// Probes the remote and runs one replay pass.
pub(crate) async fn run_impl(session: &Session) -> ReplayReport {
    session.refresh().await;
    session.queue.process_queue().await
}

pub(crate) fn report_json(report: &ReplayReport, remaining: usize) -> serde_json::Value {
    json!({
        "applied": report.applied,
        "failed": report.failed,
        "dead_lettered": report.dead_lettered,
        "stopped_offline": report.stopped_offline,
        "skipped": report.skipped.map(|reason| reason.to_string()),
        "remaining": remaining,
    })
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
