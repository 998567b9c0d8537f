// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier generation.
//!
//! Two kinds of ids exist:
//! - Temporary ids handed out for creates issued while offline:
//!   `temp_{epoch_ms}_{6 alphanumerics}`.
//! - Document ids assigned by a store on create: 20 alphanumerics.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Prefix shared by every temporary id.
pub const TEMP_ID_PREFIX: &str = "temp_";

const TEMP_SUFFIX_LEN: usize = 6;
const DOCUMENT_ID_LEN: usize = 20;

/// Generate a temporary id for a document created while offline.
pub fn generate_temp_id(now_ms: u64) -> String {
    format!("{TEMP_ID_PREFIX}{now_ms}_{}", random_alphanumeric(TEMP_SUFFIX_LEN))
}

/// Returns true if `id` has the shape of a temporary id.
pub fn is_temp_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(TEMP_ID_PREFIX) else {
        return false;
    };
    let Some((millis, suffix)) = rest.split_once('_') else {
        return false;
    };
    !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == TEMP_SUFFIX_LEN
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Generate a store-assigned document id.
pub fn generate_document_id() -> String {
    random_alphanumeric(DOCUMENT_ID_LEN)
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
