// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use fleetrs::Cli;

fn main() {
    let cli = Cli::parse();
    fleetrs::init_logging(cli.verbose);
    if let Err(e) = fleetrs::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
