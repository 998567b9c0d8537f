// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use crate::commands::{submit, sync};
use crate::config::Config;

#[tokio::test]
async fn clear_drops_and_persists() {
    let ctx = TestContext::offline();
    for _ in 0..3 {
        submit::run_impl(&ctx.session, "vehicles", "{}", None)
            .await
            .unwrap();
    }

    assert_eq!(clear(&ctx.session), 3);

    assert_eq!(ctx.session.queue.queue_size(), 0);
    assert_eq!(ctx.reopen().queue.queue_size(), 0);
}

#[tokio::test]
async fn format_item_shows_operation_target_and_attempts() {
    let ctx = TestContext::offline();
    submit::run_impl(&ctx.session, "fleets/f1/vehicles", "{}", Some("v1"))
        .await
        .unwrap();
    let mut item = ctx.session.queue.queue().remove(0);

    let line = format_item(&item);
    assert!(line.starts_with("#1 update fleets/f1/vehicles/v1 queued "));
    assert!(!line.contains("attempt"));

    item.attempts = 2;
    assert!(format_item(&item).ends_with("(2 failed attempt(s))"));
}

#[tokio::test]
async fn format_item_marks_temporary_ids() {
    let ctx = TestContext::offline();
    submit::run_impl(&ctx.session, "vehicles", "{}", None)
        .await
        .unwrap();
    let item = ctx.session.queue.queue().remove(0);

    let line = format_item(&item);

    assert!(line.starts_with("#1 create vehicles/temp_"));
    assert!(line.ends_with(" [temporary id]"));
}

#[tokio::test]
async fn exhausted_items_become_dead_letters_and_can_be_requeued() {
    let mut config = Config::default();
    config.retry.max_attempts = 1;
    let ctx = TestContext::with_config(config, false);
    submit::run_impl(&ctx.session, "vehicles", "{}", Some("v1"))
        .await
        .unwrap();
    ctx.store.reject_document("vehicles", "v1");
    ctx.set_online(true);

    let report = sync::run_impl(&ctx.session).await;

    assert_eq!(report.dead_lettered, 1);
    let letters = ctx.reopen().queue.dead_letters();
    assert_eq!(letters.len(), 1);
    let line = format_dead_letter(&letters[0]);
    assert!(line.starts_with("#1 update vehicles/v1 failed "));
    assert!(line.contains("after 1 attempt(s)"));

    assert_eq!(ctx.session.queue.retry_dead_letters(), 1);
    let requeued = ctx.reopen().queue.queue();
    assert_eq!(requeued.len(), 1);
    assert_eq!(requeued[0].attempts, 0);
}
