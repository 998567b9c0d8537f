// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::SecondsFormat;
use fleet_core::id::is_temp_id;
use fleet_core::{DeadLetter, QueueItem};

use super::Session;
use crate::cli::{OutputFormat, QueueCommand};
use crate::error::Result;

pub fn run(cmd: QueueCommand) -> Result<()> {
    let session = Session::open()?;
    match cmd {
        QueueCommand::List { output } => {
            let items = session.queue.queue();
            match output {
                OutputFormat::Text if items.is_empty() => println!("Queue is empty"),
                OutputFormat::Text => {
                    for item in &items {
                        println!("{}", format_item(item));
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string(&items)?),
            }
        }
        QueueCommand::Clear => {
            let count = clear(&session);
            println!("Cleared {count} queued write(s)");
        }
        QueueCommand::Dead { output } => {
            let letters = session.queue.dead_letters();
            match output {
                OutputFormat::Text if letters.is_empty() => println!("No dead letters"),
                OutputFormat::Text => {
                    for letter in &letters {
                        println!("{}", format_dead_letter(letter));
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string(&letters)?),
            }
        }
        QueueCommand::RetryDead => {
            let count = session.queue.retry_dead_letters();
            println!("Requeued {count} dead letter(s)");
        }
        QueueCommand::ClearDead => {
            let count = session.queue.clear_dead_letters();
            println!("Discarded {count} dead letter(s)");
        }
    }
    Ok(())
}

/// Drops every queued write. Returns how many there were.
pub(crate) fn clear(session: &Session) -> usize {
    let count = session.queue.queue_size();
    session.queue.clear_queue();
    count
}

pub(crate) fn format_item(item: &QueueItem) -> String {
    let mut line = format!(
        "#{} {} {}/{} queued {}",
        item.seq,
        item.operation,
        item.collection_path,
        item.id,
        item.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if is_temp_id(&item.id) {
        line.push_str(" [temporary id]");
    }
    if item.attempts > 0 {
        line.push_str(&format!(" ({} failed attempt(s))", item.attempts));
    }
    line
}

pub(crate) fn format_dead_letter(letter: &DeadLetter) -> String {
    let item = &letter.item;
    format!(
        "#{} {} {}/{} failed {} after {} attempt(s): {}",
        item.seq,
        item.operation,
        item.collection_path,
        item.id,
        letter.failed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        item.attempts,
        letter.error
    )
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
