//! Help command - lists every registered command.

use crate::descriptor::CommandDescriptor;
use crate::error::ConfigError;
use crate::handler::{CommandContext, CommandHandler};
use crate::response::CommandResponse;
use async_trait::async_trait;
use platform_client::Embed;

pub struct HelpHandler;

impl HelpHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HelpHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn descriptor() -> Result<CommandDescriptor, ConfigError> {
    CommandDescriptor::builder("help", HelpHandler::new())
        .description("Lists all the commands and their descriptions")
        .build()
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<CommandResponse> {
        let mut embed = Embed::new()
            .title("Help")
            .description("List of all the available commands");

        for command in ctx.registry.descriptors() {
            embed = embed.field(command.name(), command.description().unwrap_or("-"));
        }

        Ok(CommandResponse::embed(embed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;
    use guild_settings::{JsonSettingsStore, SettingsConfig};
    use platform_client::{CommandKind, Interaction, MemoryPlatform, MessageContent};

    #[tokio::test]
    async fn test_lists_commands_sorted() {
        let inspect = CommandDescriptor::builder("Inspect", HelpHandler::new())
            .kind(CommandKind::User)
            .build()
            .unwrap();
        let mut registry = CommandRegistry::new();
        registry.register(vec![descriptor().unwrap(), inspect]);
        let settings = JsonSettingsStore::new(SettingsConfig::default());
        let platform = MemoryPlatform::new();
        let interaction = Interaction::command(1, 1, "help");
        let ctx = CommandContext {
            user_id: 1,
            interaction: &interaction,
            registry: &registry,
            settings: &settings,
            platform: &platform,
        };

        let response = HelpHandler::new().execute(&ctx).await.unwrap();

        let Some(MessageContent::Embeds(embeds)) = response.content else {
            panic!("help must answer with an embed");
        };
        let fields: Vec<_> = embeds[0]
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("Inspect", "-"),
                ("help", "Lists all the commands and their descriptions"),
            ]
        );
    }
}
