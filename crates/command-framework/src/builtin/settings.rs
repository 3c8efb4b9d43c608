//! Settings command - toggles a guild's ephemeral default.

use crate::descriptor::CommandDescriptor;
use crate::error::ConfigError;
use crate::handler::{CommandContext, CommandHandler};
use crate::reply::ERROR_COLOR;
use crate::response::CommandResponse;
use async_trait::async_trait;
use platform_client::Embed;
use tracing::info;

const TITLE: &str = "Server Settings";

pub struct SettingsHandler;

impl SettingsHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SettingsHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn descriptor() -> Result<CommandDescriptor, ConfigError> {
    CommandDescriptor::builder("settings", SettingsHandler::new())
        .description("Toggle whether the bot's responses are ephemeral in this server")
        .force_ephemeral()
        .build()
}

fn refusal(text: &str) -> CommandResponse {
    CommandResponse::embed(
        Embed::new()
            .title(TITLE)
            .description(text)
            .color(ERROR_COLOR),
    )
}

#[async_trait]
impl CommandHandler for SettingsHandler {
    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<CommandResponse> {
        let Some(guild) = ctx.interaction.guild_id else {
            return Ok(refusal("You must run this command in a server."));
        };
        if !ctx.interaction.can_manage_guild {
            return Ok(refusal(
                "You do not have permission to change the server settings. \
                 You need the `Manage Server` permission.",
            ));
        }

        let ephemeral = !ctx.settings.guild_ephemeral_default(guild).await;
        ctx.settings.set_guild_ephemeral_default(guild, ephemeral).await;
        ctx.settings.schedule_flush().await;
        info!(guild, ephemeral, user = ctx.user_id, "Toggled guild ephemeral default");

        let text = if ephemeral {
            "The bot's responses are now ephemeral."
        } else {
            "The bot's responses are no longer ephemeral."
        };
        Ok(CommandResponse::embed(Embed::new().title(TITLE).description(text)))
    }
}
