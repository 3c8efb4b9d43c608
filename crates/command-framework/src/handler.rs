//! Command handler traits.

use crate::registry::CommandRegistry;
use crate::response::CommandResponse;
use async_trait::async_trait;
use guild_settings::SettingsStore;
use platform_client::{Interaction, PlatformClient, UserId};
use std::collections::BTreeMap;

/// Everything a handler gets to look at while running.
pub struct CommandContext<'a> {
    /// Caller of the interaction.
    pub user_id: UserId,
    pub interaction: &'a Interaction,
    pub registry: &'a CommandRegistry,
    pub settings: &'a dyn SettingsStore,
    pub platform: &'a dyn PlatformClient,
}

/// Runs a command invocation.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<CommandResponse>;
}

/// Handles presses of buttons the command declared.
#[async_trait]
pub trait ButtonHandler: Send + Sync {
    /// `key` is the local part of the button id.
    async fn on_button(
        &self,
        key: &str,
        ctx: &CommandContext<'_>,
    ) -> anyhow::Result<Option<CommandResponse>>;
}

/// Handles submissions of modals the command opened.
#[async_trait]
pub trait ModalHandler: Send + Sync {
    async fn on_modal(
        &self,
        key: &str,
        fields: &BTreeMap<String, String>,
        ctx: &CommandContext<'_>,
    ) -> anyhow::Result<Option<CommandResponse>>;
}

/// Adapter turning a synchronous closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap a closure as a command handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&CommandContext<'_>) -> anyhow::Result<CommandResponse> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&CommandContext<'_>) -> anyhow::Result<CommandResponse> + Send + Sync,
{
    async fn execute(&self, ctx: &CommandContext<'_>) -> anyhow::Result<CommandResponse> {
        (self.0)(ctx)
    }
}
