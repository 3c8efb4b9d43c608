//! Persisted settings types.

use platform_client::GuildId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data version for schema migrations.
pub const DATA_VERSION: u32 = 1;

/// Settings for a single guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Whether replies in this guild default to ephemeral.
    #[serde(rename = "onlyEphemeral")]
    pub only_ephemeral: bool,
}

/// Everything written to the settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsData {
    pub version: u32,
    #[serde(default)]
    pub guilds: BTreeMap<GuildId, GuildSettings>,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            version: DATA_VERSION,
            guilds: BTreeMap::new(),
        }
    }
}
