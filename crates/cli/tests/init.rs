// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;
use yare::parameterized;

#[test]
fn creates_data_dir() {
    let temp = TempDir::new().unwrap();

    fleet()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized fleet"))
        .stdout(predicate::str::contains("Remote: ws://127.0.0.1:7890"));

    assert!(temp.path().join(".fleet/config.toml").exists());
    assert!(temp.path().join(".fleet/state").is_dir());
    assert!(temp.path().join(".fleet/.gitignore").exists());
}

#[test]
fn stores_the_remote() {
    let temp = TempDir::new().unwrap();

    fleet()
        .args(["init", "--remote", "wss://fleet.example"])
        .current_dir(temp.path())
        .assert()
        .success();

    let config = std::fs::read_to_string(temp.path().join(".fleet/config.toml")).unwrap();
    assert!(config.contains("remote_url = \"wss://fleet.example\""));
}

#[test]
fn fails_if_already_initialized() {
    let temp = init_temp();

    fleet()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[parameterized(
    http = { "http://fleet.example" },
    no_scheme = { "fleet.example:7890" },
)]
fn rejects_non_websocket_remote(url: &str) {
    let temp = TempDir::new().unwrap();

    fleet()
        .args(["init", "--remote", url])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint: use ws://"));

    assert!(!temp.path().join(".fleet").exists());
}

#[test]
fn directory_flag_changes_the_working_directory() {
    let temp = TempDir::new().unwrap();

    fleet()
        .args(["-C", temp.path().to_str().unwrap(), "init"])
        .assert()
        .success();

    assert!(temp.path().join(".fleet").exists());
}

#[test]
fn commands_outside_a_project_fail() {
    let temp = TempDir::new().unwrap();

    fleet()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("run 'fleet init' first"));
}
