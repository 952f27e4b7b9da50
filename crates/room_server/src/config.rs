//! Server configuration types and defaults.

use huddle_presence::ProximityConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of the room server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Zone sizes and grouping thresholds applied to every room
    #[serde(default)]
    pub proximity: ProximityConfig,

    /// How often empty and poisoned rooms are reclaimed, in milliseconds
    #[serde(default = "default_reap_interval_ms")]
    pub reap_interval_ms: u64,

    /// How often registry statistics are logged, in seconds (0 to disable)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_reap_interval_ms() -> u64 {
    30_000
}

fn default_stats_interval_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            proximity: ProximityConfig::default(),
            reap_interval_ms: default_reap_interval_ms(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl ServerConfig {
    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    /// `None` when periodic statistics are disabled.
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.proximity.validate()?;
        if self.reap_interval_ms == 0 {
            return Err("Reap interval must be greater than 0".to_string());
        }
        Ok(())
    }
}
