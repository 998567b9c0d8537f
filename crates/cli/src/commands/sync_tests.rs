// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::submit;
use crate::commands::testing::TestContext;
use crate::sync::SkipReason;

#[tokio::test]
async fn writes_queued_offline_are_replayed_by_a_later_sync() {
    let ctx = TestContext::offline();
    let first = submit::run_impl(&ctx.session, "vehicles", r#"{"plate":"AB-1"}"#, None)
        .await
        .unwrap();
    submit::run_impl(&ctx.session, "vehicles", r#"{"status":"idle"}"#, Some("v9"))
        .await
        .unwrap();

    ctx.set_online(true);
    let session = ctx.reopen();
    let report = run_impl(&session).await;

    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(session.queue.queue_size(), 0);
    assert!(ctx.store.server_document("vehicles", &first.id).is_some());
    assert!(ctx.store.server_document("vehicles", "v9").is_some());
    assert_eq!(ctx.reopen().queue.queue_size(), 0);
}

#[tokio::test]
async fn sync_while_offline_is_skipped() {
    let ctx = TestContext::offline();
    submit::run_impl(&ctx.session, "vehicles", "{}", None)
        .await
        .unwrap();

    let report = run_impl(&ctx.session).await;

    assert_eq!(report.skipped, Some(SkipReason::Offline));
    assert_eq!(ctx.session.queue.queue_size(), 1);
}

#[tokio::test]
async fn sync_with_empty_queue_is_skipped() {
    let ctx = TestContext::new();

    let report = run_impl(&ctx.session).await;

    assert_eq!(report.skipped, Some(SkipReason::Empty));
}

#[tokio::test]
async fn rejected_writes_stay_queued_with_an_attempt_counted() {
    let ctx = TestContext::offline();
    submit::run_impl(&ctx.session, "vehicles", "{}", Some("v1"))
        .await
        .unwrap();
    ctx.store.reject_document("vehicles", "v1");

    ctx.set_online(true);
    let report = run_impl(&ctx.session).await;

    assert_eq!(report.failed, 1);
    assert_eq!(ctx.session.queue.queue()[0].attempts, 1);
}

#[test]
fn report_json_fields() {
    let report = ReplayReport {
        applied: 2,
        failed: 1,
        ..ReplayReport::default()
    };

    let value = report_json(&report, 1);

    assert_eq!(value["applied"], 2);
    assert_eq!(value["failed"], 1);
    assert_eq!(value["remaining"], 1);
    assert!(value["skipped"].is_null());

    let skipped = ReplayReport {
        skipped: Some(SkipReason::Offline),
        ..ReplayReport::default()
    };
    assert_eq!(report_json(&skipped, 0)["skipped"], "offline");
}
