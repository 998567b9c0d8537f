// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing tests for the `watch` command.

#![allow(clippy::unwrap_used)]

use super::*;

fn watch_args(args: &[&str]) -> WatchArgs {
    match parse(args).unwrap().command {
        Command::Watch(args) => args,
        _ => unreachable!("expected watch"),
    }
}

#[test]
fn defaults() {
    let args = watch_args(&["fleet", "watch", "vehicles"]);
    assert_eq!(args.collection, "vehicles");
    assert!(args.filters.is_empty());
    assert_eq!(args.order, None);
    assert_eq!(args.limit, None);
    assert!(!args.cache_only);
    assert!(!args.once);
    assert_eq!(args.output, OutputFormat::Text);
}

#[test]
fn repeated_filters_keep_order() {
    let args = watch_args(&[
        "fleet",
        "watch",
        "vehicles",
        "--where",
        "status == \"active\"",
        "-w",
        "rank > 2",
    ]);
    assert_eq!(args.filters, vec!["status == \"active\"", "rank > 2"]);
}

#[test]
fn order_limit_and_flags() {
    let args = watch_args(&[
        "fleet",
        "watch",
        "vehicles",
        "--order",
        "plate:desc",
        "-n",
        "10",
        "--cache-only",
        "--once",
        "-o",
        "json",
    ]);
    assert_eq!(args.order.as_deref(), Some("plate:desc"));
    assert_eq!(args.limit, Some(10));
    assert!(args.cache_only);
    assert!(args.once);
    assert_eq!(args.output, OutputFormat::Json);
}

#[test]
fn non_numeric_limit_is_rejected() {
    assert!(parse(&["fleet", "watch", "vehicles", "-n", "ten"]).is_err());
}
