//! Common test utilities for integration tests.

#![allow(dead_code)]

use command_framework::{
    handler_fn, CommandBuilder, CommandDescriptor, CommandResponse, Framework, FrameworkConfig,
};
use guild_settings::{JsonSettingsStore, SettingsConfig};
use platform_client::{GuildId, MemoryPlatform, MessageContent, Reply};
use std::sync::Arc;

/// Framework over an in-memory platform and settings store.
pub struct Harness {
    pub platform: Arc<MemoryPlatform>,
    pub settings: Arc<JsonSettingsStore>,
    pub framework: Framework,
}

pub fn harness(guilds: &[GuildId], commands: Vec<CommandDescriptor>) -> Harness {
    harness_with(FrameworkConfig::default(), guilds, commands)
}

pub fn harness_with(
    config: FrameworkConfig,
    guilds: &[GuildId],
    commands: Vec<CommandDescriptor>,
) -> Harness {
    let platform = Arc::new(MemoryPlatform::with_guilds(guilds.iter().copied()));
    let settings = Arc::new(JsonSettingsStore::new(config.settings.clone()));
    let framework = Framework::new(config, platform.clone(), settings.clone(), commands).unwrap();
    Harness {
        platform,
        settings,
        framework,
    }
}

/// Config without the built-in commands.
pub fn bare_config() -> FrameworkConfig {
    let mut config = FrameworkConfig::default();
    config.bot.register_default_commands = false;
    config
}

/// Text command replying with a fixed string.
pub fn text_command(name: &str, reply: &'static str) -> CommandBuilder {
    CommandDescriptor::builder(name, handler_fn(move |_| Ok(CommandResponse::text(reply))))
        .description(format!("Replies with {}", reply))
        .text_output()
}

pub fn settings_config() -> SettingsConfig {
    SettingsConfig::default()
}

pub fn text_of(reply: &Reply) -> &str {
    match &reply.content {
        MessageContent::Text(text) => text,
        MessageContent::Embeds(_) => panic!("expected text, got embeds"),
    }
}

pub fn embed_title(reply: &Reply) -> Option<&str> {
    match &reply.content {
        MessageContent::Embeds(embeds) => embeds.first().and_then(|e| e.title.as_deref()),
        MessageContent::Text(_) => None,
    }
}
