// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables used by the CLI are defined here
//! with typed accessor functions. The variable name constants are generated
//! by `build.rs` and live in the [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the `FLEET_LOG` filter directive if set and non-empty.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::FLEET_LOG).ok().filter(|v| !v.is_empty())
}

/// Returns the value of `FLEET_DIR` if set.
///
/// Overrides the `.fleet/` directory search.
pub fn data_dir() -> Option<PathBuf> {
    std::env::var(vars::FLEET_DIR).ok().map(PathBuf::from)
}

/// Returns the value of `FLEET_REMOTE_URL` if set.
///
/// Overrides `remote_url` from the config file.
pub fn remote_url() -> Option<String> {
    std::env::var(vars::FLEET_REMOTE_URL)
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
