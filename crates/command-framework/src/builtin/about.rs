//! About command - describes the bot.

use crate::config::AboutConfig;
use crate::descriptor::CommandDescriptor;
use crate::error::ConfigError;
use crate::handler::{CommandContext, CommandHandler};
use crate::response::CommandResponse;
use async_trait::async_trait;
use platform_client::Embed;
use tracing::warn;

const DEFAULT_DESCRIPTION: &str = "A bot powered by the command framework.";
const DEFAULT_FOOTER: &str = "Powered by the command framework";

pub struct AboutHandler {
    about: AboutConfig,
}

impl AboutHandler {
    pub fn new(about: AboutConfig) -> Self {
        Self { about }
    }
}

impl Default for AboutHandler {
    fn default() -> Self {
        Self::new(AboutConfig::default())
    }
}

pub(crate) fn descriptor(about: AboutConfig) -> Result<CommandDescriptor, ConfigError> {
    CommandDescriptor::builder("about", AboutHandler::new(about))
        .description("Shows information about the bot")
        .build()
}

#[async_trait]
impl CommandHandler for AboutHandler {
    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<CommandResponse> {
        let about = &self.about;
        let mut embed = Embed::new()
            .title(format!("About {}", about.name))
            .description(about.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION))
            .footer(about.footer.as_deref().unwrap_or(DEFAULT_FOOTER));
        if let Some(color) = about.color {
            embed = embed.color(color);
        }

        if about.show_server_count {
            // A failed lookup only costs the field.
            match ctx.platform.joined_guilds().await {
                Ok(guilds) => embed = embed.field("Servers", format!("Total: {}", guilds.len())),
                Err(e) => warn!("Failed to count joined guilds: {}", e),
            }
        }

        Ok(CommandResponse::embed(embed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;
    use guild_settings::{JsonSettingsStore, SettingsConfig};
    use platform_client::{Interaction, MemoryPlatform, MessageContent, Operation, ANY_TARGET};

    async fn run(handler: &AboutHandler, platform: &MemoryPlatform) -> Embed {
        let registry = CommandRegistry::new();
        let settings = JsonSettingsStore::new(SettingsConfig::default());
        let interaction = Interaction::command(1, 1, "about");
        let ctx = CommandContext {
            user_id: 1,
            interaction: &interaction,
            registry: &registry,
            settings: &settings,
            platform,
        };

        match handler.execute(&ctx).await.unwrap().content {
            Some(MessageContent::Embeds(mut embeds)) => embeds.remove(0),
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_defaults_with_server_count() {
        let platform = MemoryPlatform::with_guilds([1, 2, 3]);

        let embed = run(&AboutHandler::default(), &platform).await;

        assert_eq!(embed.title.as_deref(), Some("About Bot"));
        assert_eq!(embed.description.as_deref(), Some(DEFAULT_DESCRIPTION));
        assert_eq!(embed.footer.as_deref(), Some(DEFAULT_FOOTER));
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "Servers");
        assert_eq!(embed.fields[0].value, "Total: 3");
    }

    #[tokio::test]
    async fn test_configured_texts_without_count() {
        let handler = AboutHandler::new(AboutConfig {
            name: "Barista".into(),
            description: Some("Serves coffee".into()),
            footer: Some("Brewed daily".into()),
            color: Some(0x6F4E37),
            show_server_count: false,
        });

        let embed = run(&handler, &MemoryPlatform::with_guilds([1])).await;

        assert_eq!(embed.title.as_deref(), Some("About Barista"));
        assert_eq!(embed.description.as_deref(), Some("Serves coffee"));
        assert_eq!(embed.footer.as_deref(), Some("Brewed daily"));
        assert_eq!(embed.color, Some(0x6F4E37));
        assert!(embed.fields.is_empty());
    }

    #[tokio::test]
    async fn test_guild_lookup_failure_omits_count() {
        let platform = MemoryPlatform::with_guilds([1]);
        platform.fail(Operation::JoinedGuilds, ANY_TARGET).await;

        let embed = run(&AboutHandler::default(), &platform).await;

        assert!(embed.fields.is_empty());
    }
}
