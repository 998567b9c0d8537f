// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! The document server keeps its write log in this format: one applied write
//! per line, appended with fsync and replayed on start.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads records, skipping lines that fail to parse.
///
/// Returns the parsed records and the number of skipped lines. Empty lines
/// are ignored and a missing file reads as empty. A write that was torn by a
/// crash leaves a partial last line; this lets the log recover everything
/// before it.
pub fn read_valid<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    if !path.exists() {
        return Ok((Vec::new(), 0));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut skipped = 0;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }

    Ok((records, skipped))
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
