//! Platform client trait.

use crate::error::PlatformError;
use crate::types::*;
use async_trait::async_trait;

/// Calls the command framework makes against the chat platform.
///
/// Every call may fail independently; callers decide whether a failure is
/// fatal for the unit of work they are performing.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Guilds the bot is currently a member of.
    async fn joined_guilds(&self) -> Result<Vec<GuildId>, PlatformError>;

    /// Commands currently registered in a scope.
    async fn list_registered_commands(
        &self,
        scope: Scope,
    ) -> Result<Vec<RemoteCommand>, PlatformError>;

    /// Register a new command, returning its platform id.
    async fn create_command(
        &self,
        scope: Scope,
        spec: &CommandSpec,
    ) -> Result<CommandId, PlatformError>;

    /// Overwrite an existing registration.
    async fn update_command(
        &self,
        scope: Scope,
        id: CommandId,
        spec: &CommandSpec,
    ) -> Result<(), PlatformError>;

    /// Remove a registration.
    async fn delete_command(&self, scope: Scope, id: CommandId) -> Result<(), PlatformError>;

    /// Acknowledge an interaction, stopping the response-timeout clock.
    async fn acknowledge(
        &self,
        interaction: InteractionId,
        ephemeral: bool,
    ) -> Result<(), PlatformError>;

    /// Reply directly to an unacknowledged interaction.
    async fn reply(
        &self,
        interaction: InteractionId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError>;

    /// Send content for an interaction that was already acknowledged.
    async fn send_deferred(
        &self,
        interaction: InteractionId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError>;

    /// Delete a previously sent message.
    async fn delete_message(&self, message: SentMessage) -> Result<(), PlatformError>;
}
