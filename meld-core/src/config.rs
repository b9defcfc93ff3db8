//! Configuration for awaiting emissions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How long a bridge wait may take.
///
/// Loaded from JSON such as `{"timeout_ms": 500}`. Missing fields fall back
/// to the defaults: no timeout, so a wait lasts until the source emits or is
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Upper bound on a single wait, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl BridgeConfig {
    /// Config with a timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
