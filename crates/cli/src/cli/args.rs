// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.

use clap::Args;

use super::OutputFormat;

/// Arguments for `fleet watch`.
#[derive(Args, Clone, Debug, Default)]
pub struct WatchArgs {
    /// Collection path, e.g. "vehicles" or "fleets/f1/vehicles"
    pub collection: String,

    /// Filter expression "field op value" (repeatable)
    ///
    /// Operators: ==, !=, <, <=, >, >=, in, array-contains. Values are
    /// parsed as JSON, falling back to a plain string.
    #[arg(long = "where", short = 'w', value_name = "expr")]
    pub filters: Vec<String>,

    /// Order by a field, optionally descending ("field" or "field:desc")
    #[arg(long, value_name = "field[:desc]")]
    pub order: Option<String>,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Read only from the local cache, never from the server
    #[arg(long)]
    pub cache_only: bool,

    /// Print the first result and exit
    #[arg(long)]
    pub once: bool,

    #[arg(long, short, value_enum, default_value_t)]
    pub output: OutputFormat,
}
