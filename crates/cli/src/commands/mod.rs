// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod init;
pub mod queue;
pub mod status;
pub mod submit;
pub mod sync;
pub mod watch;

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::Path;
use std::sync::Arc;

use fleet_core::NetworkStatus;

use crate::config::{find_data_dir, state_dir, Config};
use crate::error::{Error, Result};
use crate::sync::{
    ConnectivityProbe, FileStorage, LocalStorage, MutationQueue, NetworkMonitor,
    PersistentQueueStore, QueueOptions, RemoteStore, TcpProbe, WebSocketStore,
};

/// Storage key of the WebSocket store's document cache.
pub const DOCUMENT_CACHE_KEY: &str = "document_cache";

/// Everything a command needs: config, store, connectivity and the queue.
pub struct Session {
    pub config: Config,
    pub store: Arc<dyn RemoteStore>,
    pub monitor: NetworkMonitor,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub queue: MutationQueue,
}

impl Session {
    /// Opens the session for the `.fleet` directory found from the current
    /// context.
    pub fn open() -> Result<Self> {
        let data_dir = find_data_dir()?;
        Self::open_at(&data_dir)
    }

    /// Opens the session for `data_dir`.
    ///
    /// Nothing touches the network until a command asks for connectivity.
    pub fn open_at(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::open(&state_dir(data_dir))?);
        let remote = config.remote_config();
        let probe = TcpProbe::from_url(&remote.url, config.probe_timeout())
            .ok_or_else(|| Error::InvalidRemoteUrl(remote.url.clone()))?;
        let store = WebSocketStore::connect_lazy(remote)
            .with_cache_storage(Arc::clone(&storage), DOCUMENT_CACHE_KEY);
        Ok(Self::with_parts(
            config,
            Arc::new(store),
            Arc::new(probe),
            storage,
        ))
    }

    /// Assembles a session from its parts. The network starts offline.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn RemoteStore>,
        probe: Arc<dyn ConnectivityProbe>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let monitor = NetworkMonitor::new(false);
        let persistence = PersistentQueueStore::new(storage, config.storage_key.clone());
        let queue = MutationQueue::open(
            Arc::clone(&store),
            monitor.clone(),
            persistence,
            QueueOptions {
                policy: config.retry_policy(),
                clock: None,
            },
        );
        Session {
            config,
            store,
            monitor,
            probe,
            queue,
        }
    }

    /// Probes connectivity once and updates the monitor.
    pub async fn refresh(&self) -> NetworkStatus {
        self.monitor.refresh(self.probe.as_ref()).await
    }
}
