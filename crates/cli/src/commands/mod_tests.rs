// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

//! Test infrastructure for command testing without a server or filesystem.
//!
//! [`TestContext`] wires a [`Session`] to an in-memory store, in-memory
//! storage and a probe whose answer the test controls.
//!
//! ```rust,ignore
//! let ctx = TestContext::offline();
//! submit::run_impl(&ctx.session, "vehicles", "{}", None).await?;
//!
//! ctx.set_online(true);
//! let session = ctx.reopen(); // the next CLI invocation
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Session;
use crate::config::Config;
use crate::sync::{ConnectivityProbe, MemoryStorage, MemoryStore, ProbeReport};

/// Probe that reports whatever the test last set.
pub struct SwitchProbe(AtomicBool);

impl ConnectivityProbe for SwitchProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = ProbeReport> + Send + '_>> {
        let report = if self.0.load(Ordering::SeqCst) {
            ProbeReport::online("test")
        } else {
            ProbeReport::offline()
        };
        Box::pin(async move { report })
    }
}

/// A session over in-memory parts.
pub struct TestContext {
    pub session: Session,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
    pub config: Config,
    probe: Arc<SwitchProbe>,
}

impl TestContext {
    /// A context whose probe reports online.
    pub fn new() -> Self {
        Self::with_config(Config::default(), true)
    }

    /// A context whose probe reports offline and whose store is unreachable.
    pub fn offline() -> Self {
        Self::with_config(Config::default(), false)
    }

    pub fn with_config(config: Config, online: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.set_reachable(online);
        let storage = Arc::new(MemoryStorage::new());
        let probe = Arc::new(SwitchProbe(AtomicBool::new(online)));
        let session = Session::with_parts(
            config.clone(),
            store.clone(),
            probe.clone(),
            storage.clone(),
        );
        TestContext {
            session,
            store,
            storage,
            config,
            probe,
        }
    }

    /// Flips both the probe and the store's reachability.
    pub fn set_online(&self, online: bool) {
        self.probe.0.store(online, Ordering::SeqCst);
        self.store.set_reachable(online);
    }

    /// A fresh session over the same store and storage, as a later CLI
    /// invocation would see them.
    pub fn reopen(&self) -> Session {
        Session::with_parts(
            self.config.clone(),
            self.store.clone(),
            self.probe.clone(),
            self.storage.clone(),
        )
    }
}
