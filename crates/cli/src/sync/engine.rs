// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation queue engine.
//!
//! [`MutationQueue`] owns the in-memory queue of pending writes and replays
//! it against the [`RemoteStore`] when the [`NetworkMonitor`] reports
//! online. Every change is applied to the persisted queue inside one
//! storage transaction and the result becomes the in-memory queue, so
//! several queues opened on the same storage (one per `fleet` process) see
//! each other's writes and hand out distinct sequence numbers.
//!
//! Replay walks a copy of the queue taken when the pass starts. Items are
//! applied one at a time in enqueue order; each success removes its item by
//! sequence number, so writes enqueued during a pass are untouched and wait
//! for the next one. A failure leaves the item queued. If the network is
//! offline after the failure the pass stops there and the attempt does not
//! count; otherwise the item's attempt counter grows and, once it reaches
//! [`RetryPolicy::max_attempts`], the item moves to the dead-letter list.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fleet_core::{ClockSource, DeadLetter, Document, Operation, QueueItem, SystemClock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::network::NetworkMonitor;
use super::queue::PersistentQueueStore;
use super::store::{RemoteStore, StoreError};

const EVENT_CAPACITY: usize = 256;

/// When to give up on a failing item and how long to wait between passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts before an item is dead-lettered. `None` retries forever.
    pub max_attempts: Option<u32>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: Some(5),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the pass following `failed_passes` consecutive passes
    /// that left failures behind (counting from 0).
    pub fn backoff(&self, failed_passes: u32) -> Duration {
        let factor = 2u32.checked_pow(failed_passes).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Options for [`MutationQueue::open`].
#[derive(Clone, Default)]
pub struct QueueOptions {
    pub policy: RetryPolicy,
    /// Defaults to the system clock.
    pub clock: Option<Arc<dyn ClockSource>>,
}

/// Why a replay pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    Empty,
    AlreadyProcessing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Offline => write!(f, "offline"),
            SkipReason::Empty => write!(f, "queue empty"),
            SkipReason::AlreadyProcessing => write!(f, "already processing"),
        }
    }
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    /// The pass stopped early because the network went offline.
    pub stopped_offline: bool,
    pub skipped: Option<SkipReason>,
}

impl ReplayReport {
    fn skipped(reason: SkipReason) -> Self {
        ReplayReport {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = self.skipped {
            return write!(f, "skipped: {reason}");
        }
        write!(f, "applied {}, failed {}", self.applied, self.failed)?;
        if self.dead_lettered > 0 {
            write!(f, ", dead-lettered {}", self.dead_lettered)?;
        }
        if self.stopped_offline {
            write!(f, " (stopped: offline)")?;
        }
        Ok(())
    }
}

/// Something that happened to the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued(QueueItem),
    Applied(QueueItem),
    Failed { item: QueueItem, error: StoreError },
    DeadLettered(DeadLetter),
    Cleared { count: usize },
    PassFinished(ReplayReport),
}

struct QueueState {
    items: Vec<QueueItem>,
    dead: Vec<DeadLetter>,
    next_seq: u64,
    /// The last change could not be persisted; memory is ahead of storage.
    unsaved: bool,
}

impl QueueState {
    /// Replaces the lists with the stored ones, keeping sequence numbers
    /// ahead of everything seen.
    fn adopt(&mut self, items: Vec<QueueItem>, dead: Vec<DeadLetter>) {
        self.items = valid_items(items);
        self.dead = dead;
        let stored_next = self
            .items
            .iter()
            .map(|item| item.seq)
            .chain(self.dead.iter().map(|letter| letter.item.seq))
            .max()
            .map_or(1, |seq| seq + 1);
        self.next_seq = self.next_seq.max(stored_next);
    }
}

fn valid_items(items: Vec<QueueItem>) -> Vec<QueueItem> {
    items
        .into_iter()
        .filter(|item| match item.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(seq = item.seq, error = %e, "dropping invalid queued item");
                false
            }
        })
        .collect()
}

struct Shared {
    store: Arc<dyn RemoteStore>,
    monitor: NetworkMonitor,
    persistence: PersistentQueueStore,
    clock: Arc<dyn ClockSource>,
    policy: RetryPolicy,
    state: Mutex<QueueState>,
    processing: AtomicBool,
    events: broadcast::Sender<QueueEvent>,
}

/// Clears the processing flag when a pass ends, however it ends.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The offline mutation queue. Cloning yields another handle on the same queue.
#[derive(Clone)]
pub struct MutationQueue {
    shared: Arc<Shared>,
}

impl MutationQueue {
    /// Opens the queue, loading any persisted items.
    ///
    /// Unreadable persisted data is logged and treated as an empty queue.
    pub fn open(
        store: Arc<dyn RemoteStore>,
        monitor: NetworkMonitor,
        persistence: PersistentQueueStore,
        options: QueueOptions,
    ) -> Self {
        let mut state = QueueState {
            items: Vec::new(),
            dead: Vec::new(),
            next_seq: 1,
            unsaved: false,
        };
        load_into(&persistence, &mut state);
        tracing::debug!(items = state.items.len(), dead = state.dead.len(), "queue loaded");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        MutationQueue {
            shared: Arc::new(Shared {
                store,
                monitor,
                persistence,
                clock: options.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                policy: options.policy,
                state: Mutex::new(state),
                processing: AtomicBool::new(false),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: QueueEvent) {
        // No receivers is fine.
        let _ = self.shared.events.send(event);
    }

    /// Applies `change` to the stored queue and adopts the result.
    ///
    /// While an earlier change is unsaved, the in-memory lists win over the
    /// stored ones. If storage fails, `change` still runs on the in-memory
    /// queue and the failure is only logged.
    fn mutate(&self, mut change: impl FnMut(&mut QueueState)) {
        let mut state = self.lock();
        let mut ran = false;
        let saved = self.shared.persistence.update(|items, dead| {
            if !state.unsaved {
                state.adopt(std::mem::take(items), std::mem::take(dead));
            }
            change(&mut state);
            ran = true;
            items.clone_from(&state.items);
            dead.clone_from(&state.dead);
        });
        match saved {
            Ok(()) => state.unsaved = false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist queue");
                state.unsaved = true;
                if !ran {
                    change(&mut state);
                }
            }
        }
    }

    /// Picks up changes other queues made to the shared storage.
    fn refresh(&self) {
        let mut state = self.lock();
        if !state.unsaved {
            load_into(&self.shared.persistence, &mut state);
        }
    }

    /// Appends a write to the queue and persists it.
    ///
    /// Returns the queued item. Invalid input is an error; a persistence
    /// failure is only logged and the item stays queued in memory.
    pub fn enqueue(
        &self,
        operation: Operation,
        collection_path: &str,
        id: &str,
        data: Option<Document>,
    ) -> fleet_core::Result<QueueItem> {
        let timestamp = self.shared.clock.now();
        let mut item = QueueItem::new(0, operation, collection_path, id, data, timestamp)?;
        self.mutate(|state| {
            item.seq = state.next_seq;
            state.next_seq += 1;
            state.items.push(item.clone());
        });

        tracing::debug!(seq = item.seq, %operation, collection = collection_path, id, "enqueued");
        self.emit(QueueEvent::Enqueued(item.clone()));
        Ok(item)
    }

    /// Replays the queue against the remote store.
    ///
    /// Does nothing unless the network is online, the queue is non-empty and
    /// no other pass is running. Never returns an error; per-item failures
    /// are reported through [`QueueEvent::Failed`] and the report counts.
    pub async fn process_queue(&self) -> ReplayReport {
        if !self.shared.monitor.is_online() {
            return ReplayReport::skipped(SkipReason::Offline);
        }
        self.refresh();
        if self.queue_size() == 0 {
            return ReplayReport::skipped(SkipReason::Empty);
        }
        if self
            .shared
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return ReplayReport::skipped(SkipReason::AlreadyProcessing);
        }
        let _guard = ProcessingGuard(&self.shared.processing);

        let snapshot = self.queue();
        tracing::info!(items = snapshot.len(), "replaying queue");
        let mut report = ReplayReport::default();

        for item in snapshot {
            if !self.contains(item.seq) {
                // Cleared while the pass was running.
                continue;
            }
            match self.apply(&item).await {
                Ok(()) => {
                    self.mutate(|state| state.items.retain(|queued| queued.seq != item.seq));

                    tracing::debug!(seq = item.seq, id = %item.id, "applied");
                    report.applied += 1;
                    self.emit(QueueEvent::Applied(item));
                }
                Err(error) => {
                    tracing::warn!(seq = item.seq, id = %item.id, error = %error, "replay failed");
                    report.failed += 1;
                    self.emit(QueueEvent::Failed {
                        item: item.clone(),
                        error: error.clone(),
                    });

                    if !self.shared.monitor.is_online() {
                        report.stopped_offline = true;
                        break;
                    }
                    if let Some(letter) = self.record_failure(item.seq, &error) {
                        report.dead_lettered += 1;
                        self.emit(QueueEvent::DeadLettered(letter));
                    }
                }
            }
        }

        tracing::info!(%report, remaining = self.queue_size(), "replay finished");
        self.emit(QueueEvent::PassFinished(report.clone()));
        report
    }

    async fn apply(&self, item: &QueueItem) -> Result<(), StoreError> {
        let store = &self.shared.store;
        match item.operation {
            Operation::Create | Operation::Update => {
                let data = item.data.clone().unwrap_or_default();
                store
                    .set_document(&item.collection_path, &item.id, data, true)
                    .await
            }
            Operation::Delete => store.delete_document(&item.collection_path, &item.id).await,
        }
    }

    fn contains(&self, seq: u64) -> bool {
        self.lock().items.iter().any(|item| item.seq == seq)
    }

    /// Counts a failed attempt, dead-lettering the item if its budget is spent.
    fn record_failure(&self, seq: u64, error: &StoreError) -> Option<DeadLetter> {
        let failed_at = self.shared.clock.now();
        let mut dead_lettered = None;
        self.mutate(|state| {
            dead_lettered = None;
            let Some(pos) = state.items.iter().position(|item| item.seq == seq) else {
                return;
            };
            state.items[pos].attempts += 1;
            if !self.shared.policy.exhausted(state.items[pos].attempts) {
                return;
            }
            let letter = DeadLetter {
                item: state.items.remove(pos),
                error: error.to_string(),
                failed_at,
            };
            state.dead.push(letter.clone());
            dead_lettered = Some(letter);
        });

        if let Some(letter) = &dead_lettered {
            tracing::warn!(seq, id = %letter.item.id, attempts = letter.item.attempts, "giving up on item");
        }
        dead_lettered
    }

    /// Empties the queue and persists the empty queue.
    pub fn clear_queue(&self) {
        let mut count = 0;
        self.mutate(|state| {
            count = state.items.len();
            state.items.clear();
        });

        tracing::info!(count, "queue cleared");
        self.emit(QueueEvent::Cleared { count });
    }

    /// Copy of the pending items, in order, as of this queue's last change
    /// or replay pass.
    pub fn queue(&self) -> Vec<QueueItem> {
        self.lock().items.clone()
    }

    pub fn queue_size(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true while a replay pass is running.
    pub fn is_processing(&self) -> bool {
        self.shared.processing.load(Ordering::SeqCst)
    }

    /// Items that exhausted their retry budget.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.lock().dead.clone()
    }

    /// Moves every dead letter back to the tail of the queue with its
    /// attempt count reset. Returns how many were re-queued.
    pub fn retry_dead_letters(&self) -> usize {
        let mut count = 0;
        self.mutate(|state| {
            let letters = std::mem::take(&mut state.dead);
            count = letters.len();
            for letter in letters {
                let mut item = letter.item;
                item.seq = state.next_seq;
                item.attempts = 0;
                state.next_seq += 1;
                state.items.push(item);
            }
        });
        count
    }

    /// Discards every dead letter. Returns how many were discarded.
    pub fn clear_dead_letters(&self) -> usize {
        let mut count = 0;
        self.mutate(|state| {
            count = state.dead.len();
            state.dead.clear();
        });
        count
    }

    /// Receiver for queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.events.subscribe()
    }

    /// The monitor this queue consults.
    pub fn monitor(&self) -> &NetworkMonitor {
        &self.shared.monitor
    }

    /// The clock used for item timestamps.
    pub fn clock(&self) -> Arc<dyn ClockSource> {
        Arc::clone(&self.shared.clock)
    }

    /// Starts replaying automatically.
    ///
    /// Each offline-to-online transition runs one pass if the queue has
    /// items and no pass is running. While online, a pass that leaves failed
    /// items behind schedules another after the policy's backoff. Abort the
    /// handle to stop.
    pub fn spawn_auto_replay(&self) -> JoinHandle<()> {
        let queue = self.clone();
        let monitor = self.shared.monitor.clone();
        let mut status = monitor.subscribe();
        // Read under the status borrow so the count matches the value.
        let mut seen_reconnects = {
            let _current = status.borrow_and_update();
            monitor.reconnects()
        };
        tokio::spawn(async move {
            let mut failed_passes: u32 = 0;
            let mut retry_after: Option<Duration> = None;

            loop {
                tokio::select! {
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        // Updates coalesce, so an offline-online flip may
                        // arrive as a single "online" value. The reconnect
                        // count still moved.
                        let (online, reconnects) = {
                            let current = status.borrow_and_update();
                            (current.is_online, monitor.reconnects())
                        };
                        let came_online = online && reconnects != seen_reconnects;
                        seen_reconnects = reconnects;
                        if !came_online {
                            if !online {
                                retry_after = None;
                            }
                            continue;
                        }
                        failed_passes = 0;
                    }
                    _ = tokio::time::sleep(retry_after.unwrap_or_default()), if retry_after.is_some() => {}
                }

                retry_after = None;
                let report = queue.process_queue().await;
                if report.skipped.is_some() || report.stopped_offline {
                    continue;
                }
                if report.failed > 0 && queue.queue_size() > 0 {
                    let delay = queue.shared.policy.backoff(failed_passes);
                    tracing::debug!(?delay, "scheduling retry");
                    failed_passes = failed_passes.saturating_add(1);
                    retry_after = Some(delay);
                } else {
                    failed_passes = 0;
                }
            }
        })
    }
}

/// Loads the stored lists into `state`. Unreadable data counts as empty.
fn load_into(persistence: &PersistentQueueStore, state: &mut QueueState) {
    let items = persistence.load().unwrap_or_else(|e| {
        tracing::warn!(key = persistence.key(), error = %e, "failed to load queue, starting empty");
        Vec::new()
    });
    let dead = persistence.load_dead_letters().unwrap_or_else(|e| {
        tracing::warn!(key = persistence.dead_letter_key(), error = %e, "failed to load dead letters");
        Vec::new()
    });
    state.adopt(items, dead);
}
