// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use crate::config::{init_data_dir, Config};
use crate::error::Result;

pub fn run(remote: Option<String>) -> Result<()> {
    let target = std::env::current_dir()?;
    let (data_dir, config) = run_impl(&target, remote)?;

    println!("Initialized fleet at {}", data_dir.display());
    println!("Remote: {}", config.remote_url);
    Ok(())
}

pub(crate) fn run_impl(target: &Path, remote: Option<String>) -> Result<(PathBuf, Config)> {
    let config = match remote {
        Some(url) => Config::with_remote(url)?,
        None => Config::default(),
    };
    let data_dir = init_data_dir(target, &config)?;
    Ok((data_dir, config))
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
