// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity status as observed by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current connectivity signal.
///
/// `connection_type` and `effective_type` are best-effort descriptors; they
/// stay `None` when the platform offers no such signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub is_online: bool,
    /// Instant of the last online/offline transition.
    pub last_changed: Option<DateTime<Utc>>,
    pub connection_type: Option<String>,
    pub effective_type: Option<String>,
}

impl NetworkStatus {
    /// A status with no transition recorded yet.
    pub fn initial(is_online: bool) -> Self {
        NetworkStatus { is_online, last_changed: None, connection_type: None, effective_type: None }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::initial(false)
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.is_online { "online" } else { "offline" })?;
        match (&self.connection_type, &self.effective_type) {
            (Some(kind), Some(effective)) => write!(f, " ({kind}, {effective})"),
            (Some(kind), None) => write!(f, " ({kind})"),
            (None, Some(effective)) => write!(f, " ({effective})"),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn default_is_offline_without_transition() {
        let status = NetworkStatus::default();
        assert!(!status.is_online);
        assert!(status.last_changed.is_none());
    }

    #[test]
    fn display_includes_descriptors() {
        let mut status = NetworkStatus::initial(true);
        assert_eq!(status.to_string(), "online");

        status.connection_type = Some("wifi".into());
        assert_eq!(status.to_string(), "online (wifi)");

        status.effective_type = Some("4g".into());
        assert_eq!(status.to_string(), "online (wifi, 4g)");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&NetworkStatus::initial(true)).unwrap();
        assert!(json.contains("\"isOnline\":true"));
        assert!(json.contains("\"lastChanged\":null"));
    }
}
