// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::SecondsFormat;
use fleet_core::query::{parse_filter, parse_order};
use fleet_core::{QueryConstraint, SystemClock};
use serde_json::json;

use super::Session;
use crate::cli::{OutputFormat, WatchArgs};
use crate::error::{Error, Result};
use crate::sync::{spawn_probe, CacheAwareReader, LiveQuery, ReadOptions, ReadState};

pub async fn run(args: WatchArgs) -> Result<()> {
    let session = Session::open()?;
    let constraints = build_constraints(&args)?;
    session.refresh().await;

    let reader = CacheAwareReader::new(
        Arc::clone(&session.store),
        session.monitor.clone(),
        Arc::new(SystemClock),
    );
    let options = ReadOptions {
        cache_only: args.cache_only,
    };
    let mut live = reader.watch(&args.collection, constraints, options)?;

    if args.once {
        let state = first_result(&mut live).await?;
        print!("{}", render(&state, args.output)?);
        return Ok(());
    }

    // Keep connectivity current and flush queued writes while watching.
    let probe = spawn_probe(
        session.monitor.clone(),
        Arc::clone(&session.probe),
        session.config.probe_interval(),
    );
    let replay = session.queue.spawn_auto_replay();
    let result = follow(&mut live, |state| {
        print!("{}", render(state, args.output)?);
        Ok(())
    })
    .await;
    probe.abort();
    replay.abort();
    result
}

/// Turns `--where`, `--order` and `--limit` into query constraints.
pub(crate) fn build_constraints(args: &WatchArgs) -> Result<Vec<QueryConstraint>> {
    let mut constraints = args
        .filters
        .iter()
        .map(|expr| parse_filter(expr))
        .collect::<fleet_core::Result<Vec<_>>>()?;
    if let Some(order) = &args.order {
        constraints.push(parse_order(order)?);
    }
    if let Some(n) = args.limit {
        constraints.push(QueryConstraint::limit(n));
    }
    Ok(constraints)
}

/// Waits for the first state that is not loading.
pub(crate) async fn first_result(live: &mut LiveQuery) -> Result<ReadState> {
    live.wait_for(|state| !state.is_loading)
        .await
        .ok_or(Error::WatchEnded)
}

/// Hands every settled state to `on_state` until the query ends.
///
/// A state equal to the last one handed over is skipped.
pub(crate) async fn follow(
    live: &mut LiveQuery,
    mut on_state: impl FnMut(&ReadState) -> Result<()>,
) -> Result<()> {
    let mut last: Option<ReadState> = None;
    let current = live.state();
    if !current.is_loading {
        on_state(&current)?;
        last = Some(current);
    }
    while let Some(state) = live.changed().await {
        if state.is_loading || last.as_ref() == Some(&state) {
            continue;
        }
        on_state(&state)?;
        last = Some(state);
    }
    Err(Error::WatchEnded)
}

pub(crate) fn render(state: &ReadState, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Text => Ok(render_text(state)),
        OutputFormat::Json => {
            let value = json!({
                "data": state.data,
                "from_cache": state.from_cache,
                "is_offline": state.is_offline,
                "error": state.error,
                "last_updated_at": state.last_updated_at,
            });
            Ok(format!("{}\n", serde_json::to_string(&value)?))
        }
    }
}

fn render_text(state: &ReadState) -> String {
    let mut out = String::new();
    let source = match (state.from_cache, state.is_offline) {
        (true, true) => "cache, offline",
        (true, false) => "cache",
        (false, _) => "server",
    };
    let _ = write!(out, "[{source}] {} document(s)", state.data.len());
    if let Some(at) = state.last_updated_at {
        let _ = write!(
            out,
            " at {}",
            at.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }
    out.push('\n');
    for record in &state.data {
        let fields = serde_json::Value::Object(record.fields.clone());
        let _ = writeln!(out, "  {} {}", record.id, fields);
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "  warning: {error}");
    }
    out
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
