// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// A remote nothing listens on, so every command takes the offline path.
pub const UNREACHABLE_REMOTE: &str = "ws://127.0.0.1:1";

pub fn fleet() -> Command {
    let mut cmd = cargo_bin_cmd!("fleet");
    cmd.env_remove("FLEET_DIR")
        .env_remove("FLEET_REMOTE_URL")
        .env_remove("FLEET_LOG");
    cmd
}

/// Helper to create an initialized temp directory pointing at an unreachable remote
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    fleet()
        .args(["init", "--remote", UNREACHABLE_REMOTE])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Helper to queue a create and return its temporary id
pub fn submit_offline(temp: &TempDir, collection: &str, data: &str) -> String {
    let output = fleet()
        .args(["submit", collection, data])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "submit failed: {:?}", output);

    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .find_map(|word| word.strip_prefix(&format!("{collection}/")))
        .unwrap()
        .to_string()
}
