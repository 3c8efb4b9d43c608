//! Settings store configuration.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Settings store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// JSON file backing the store. In-memory only when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Delay between the first flush request and the write
    #[serde(default = "default_flush_delay", with = "humantime_serde")]
    pub flush_delay: Duration,

    /// Minimum spacing between two writes
    #[serde(default = "default_min_write_interval", with = "humantime_serde")]
    pub min_write_interval: Duration,

    /// Ephemeral default reported for guilds with no stored settings
    #[serde(default = "default_true")]
    pub default_guild_ephemeral: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: None,
            flush_delay: default_flush_delay(),
            min_write_interval: default_min_write_interval(),
            default_guild_ephemeral: default_true(),
        }
    }
}

fn default_flush_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_min_write_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}
