// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity sensing.
//!
//! [`NetworkMonitor`] owns the current [`NetworkStatus`] and publishes it
//! through a `watch` channel. It is fed either by explicit
//! [`set_online`](NetworkMonitor::set_online) calls or by a
//! [`ConnectivityProbe`] polled on an interval with [`spawn_probe`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_core::{ClockSource, NetworkStatus, SystemClock};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared handle on the connectivity signal.
///
/// Cloning is cheap; all clones observe and update the same status.
#[derive(Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<NetworkStatus>>,
    /// Offline-to-online transitions so far. Bumped while the new status is
    /// being published, so a reader holding a status borrow sees a count
    /// that matches it.
    reconnects: Arc<AtomicU64>,
    clock: Arc<dyn ClockSource>,
}

impl NetworkMonitor {
    /// Creates a monitor reading time from the system clock.
    pub fn new(initially_online: bool) -> Self {
        Self::with_clock(initially_online, Arc::new(SystemClock))
    }

    /// Creates a monitor with an injected clock.
    pub fn with_clock(initially_online: bool, clock: Arc<dyn ClockSource>) -> Self {
        let (tx, _rx) = watch::channel(NetworkStatus::initial(initially_online));
        NetworkMonitor {
            tx: Arc::new(tx),
            reconnects: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Current status.
    pub fn status(&self) -> NetworkStatus {
        self.tx.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().is_online
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }

    /// Records an online/offline signal.
    ///
    /// Returns true if this was a transition. Repeating the current value
    /// changes nothing and notifies no one.
    pub fn set_online(&self, online: bool) -> bool {
        let now = self.clock.now();
        let changed = self.tx.send_if_modified(|status| {
            if status.is_online == online {
                return false;
            }
            status.is_online = online;
            status.last_changed = Some(now);
            if online {
                self.reconnects.fetch_add(1, Ordering::SeqCst);
            }
            true
        });
        if changed {
            tracing::info!(online, "network status changed");
        }
        changed
    }

    /// Number of offline-to-online transitions since the monitor was created.
    ///
    /// Status notifications coalesce; this count does not, so a subscriber
    /// can tell that the network came back even if it never saw the
    /// offline value in between.
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Updates the best-effort connection descriptors.
    pub fn set_connection_info(&self, connection_type: Option<String>, effective_type: Option<String>) {
        self.tx.send_if_modified(|status| {
            if status.connection_type == connection_type && status.effective_type == effective_type {
                return false;
            }
            status.connection_type = connection_type;
            status.effective_type = effective_type;
            true
        });
    }

    /// Applies a probe result.
    pub fn apply(&self, report: ProbeReport) {
        self.set_connection_info(report.connection_type, report.effective_type);
        self.set_online(report.online);
    }

    /// Runs the probe once and applies its result.
    pub async fn refresh(&self, probe: &dyn ConnectivityProbe) -> NetworkStatus {
        let report = probe.probe().await;
        self.apply(report);
        self.status()
    }
}

/// Outcome of one connectivity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub online: bool,
    pub connection_type: Option<String>,
    pub effective_type: Option<String>,
}

impl ProbeReport {
    pub fn online(connection_type: impl Into<String>) -> Self {
        ProbeReport {
            online: true,
            connection_type: Some(connection_type.into()),
            effective_type: None,
        }
    }

    pub fn offline() -> Self {
        ProbeReport::default()
    }
}

/// Source of connectivity signals.
pub trait ConnectivityProbe: Send + Sync {
    /// Checks connectivity. Never fails; an error means offline.
    fn probe(&self) -> Pin<Box<dyn Future<Output = ProbeReport> + Send + '_>>;
}

/// Reports online when a TCP connection to the remote host succeeds.
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }

    /// Builds a probe for the host and port of a `ws://` or `wss://` URL.
    ///
    /// Returns `None` for other schemes or a missing host.
    pub fn from_url(url: &str, timeout: Duration) -> Option<Self> {
        let (rest, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
            (rest, 80)
        } else if let Some(rest) = url.strip_prefix("wss://") {
            (rest, 443)
        } else {
            return None;
        };
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if authority.is_empty() {
            return None;
        }
        let has_port = match authority.rsplit_once(':') {
            // Bracketed IPv6 without port ends with ']'
            Some((_, port)) => !port.ends_with(']'),
            None => false,
        };
        let addr = if has_port {
            authority.to_string()
        } else {
            format!("{authority}:{default_port}")
        };
        Some(TcpProbe::new(addr, timeout))
    }

    /// Address dialed, as `host:port`.
    #[cfg(test)]
    pub(crate) fn addr(&self) -> &str {
        &self.addr
    }
}

impl ConnectivityProbe for TcpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = ProbeReport> + Send + '_>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
                Ok(Ok(_stream)) => ProbeReport::online("tcp"),
                Ok(Err(e)) => {
                    tracing::debug!(addr = %self.addr, error = %e, "probe failed");
                    ProbeReport::offline()
                }
                Err(_) => {
                    tracing::debug!(addr = %self.addr, "probe timed out");
                    ProbeReport::offline()
                }
            }
        })
    }
}

/// Polls `probe` every `interval` and feeds the monitor.
///
/// The first check runs immediately. Abort the handle to stop polling.
pub fn spawn_probe(
    monitor: NetworkMonitor,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            monitor.refresh(probe.as_ref()).await;
        }
    })
}
