//! Framework configuration loaded from environment variables.

use anyhow::{Context, Result};
use guild_settings::SettingsConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Framework configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameworkConfig {
    /// Bot configuration
    #[serde(default)]
    pub bot: BotConfig,

    /// Dispatcher configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Guild settings storage
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Contents of the built-in `about` command
    #[serde(default)]
    pub about: AboutConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Push every command definition on the first sync pass
    #[serde(default)]
    pub update_commands_on_launch: bool,

    /// Register the built-in `help` and `settings` commands
    #[serde(default = "default_true")]
    pub register_default_commands: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchConfig {
    /// Interactions handled at once, 0 for no limit
    #[serde(default)]
    pub max_concurrent_interactions: usize,
}

/// What the `about` command shows. Unset texts fall back to defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AboutConfig {
    /// Bot name used in the title
    #[serde(default = "default_bot_name")]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub footer: Option<String>,

    /// Embed color as 0xRRGGBB
    #[serde(default)]
    pub color: Option<u32>,

    /// Add a field with the number of joined servers
    #[serde(default = "default_true")]
    pub show_server_count: bool,
}

impl Default for AboutConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            description: None,
            footer: None,
            color: None,
            show_server_count: default_true(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            update_commands_on_launch: false,
            register_default_commands: default_true(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_bot_name() -> String {
    "Bot".into()
}

fn default_true() -> bool {
    true
}

impl FrameworkConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_environment(config::Environment::default())
    }

    /// Load configuration from explicit `KEY__SUB=value` pairs instead of the
    /// process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_environment(config::Environment::default().source(Some(vars)))
    }

    fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(false))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
