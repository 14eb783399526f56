//! `[tracker]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [tracker]
//! poll_ms = 500    # fallback rescan interval when file events are unreliable
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output artifact tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Poll interval in milliseconds.
    pub poll_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { poll_ms: 500 }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}
