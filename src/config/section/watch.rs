//! `[watch]` section configuration.
//!
//! Stopping the watch process is two-phase: a graceful termination signal,
//! then a forceful kill if the process is still alive after `grace_ms`.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! grace_ms = 2000        # wait after the termination signal
//! kill_grace_ms = 1000   # wait after the forceful kill
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::supervisor::StopTimeouts;

/// Watch process lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub grace_ms: u64,
    pub kill_grace_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            grace_ms: 2000,
            kill_grace_ms: 1000,
        }
    }
}

impl WatchConfig {
    pub fn timeouts(&self) -> StopTimeouts {
        StopTimeouts {
            grace: Duration::from_millis(self.grace_ms),
            kill_grace: Duration::from_millis(self.kill_grace_ms),
        }
    }
}
