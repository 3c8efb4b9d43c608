//! Pre- and post-execution hooks.

use crate::descriptor::CommandDescriptor;
use crate::response::CommandResponse;
use async_trait::async_trait;
use platform_client::Interaction;
use std::sync::Arc;
use tracing::debug;

/// When a hook runs relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Pre,
    Post,
}

/// Pluggable step run around a command without touching its handler.
///
/// Hooks run inside the platform's response deadline for immediate-reply
/// commands and must return promptly.
#[async_trait]
pub trait CommandHook: Send + Sync {
    fn stage(&self) -> HookStage;

    /// `prior` is the outgoing response for post-hooks, `None` for pre-hooks.
    /// Returning a response overrides what would otherwise be sent.
    async fn run(
        &self,
        command: &CommandDescriptor,
        interaction: &Interaction,
        prior: Option<&CommandResponse>,
    ) -> anyhow::Result<Option<CommandResponse>>;
}

/// Ordered hooks of one command.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn CommandHook>>,
}

impl HookChain {
    pub fn new(hooks: Vec<Arc<dyn CommandHook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn in_stage(&self, stage: HookStage) -> impl Iterator<Item = &Arc<dyn CommandHook>> {
        self.hooks.iter().filter(move |h| h.stage() == stage)
    }

    /// Run pre-hooks in order. The first non-empty override wins and the
    /// remaining pre-hooks are skipped.
    pub async fn run_pre(
        &self,
        command: &CommandDescriptor,
        interaction: &Interaction,
    ) -> anyhow::Result<Option<CommandResponse>> {
        for (index, hook) in self.in_stage(HookStage::Pre).enumerate() {
            if let Some(response) = hook.run(command, interaction, None).await? {
                if !response.is_empty() {
                    debug!(command = command.name(), index, "Pre-hook override");
                    return Ok(Some(response));
                }
            }
        }
        Ok(None)
    }

    /// Run every post-hook in order over the outgoing response. A non-empty
    /// override replaces it for later hooks and for the final send.
    pub async fn run_post(
        &self,
        command: &CommandDescriptor,
        interaction: &Interaction,
        mut outgoing: CommandResponse,
    ) -> anyhow::Result<CommandResponse> {
        for (index, hook) in self.in_stage(HookStage::Post).enumerate() {
            if let Some(response) = hook.run(command, interaction, Some(&outgoing)).await? {
                if !response.is_empty() {
                    debug!(command = command.name(), index, "Post-hook override");
                    outgoing = response;
                }
            }
        }
        Ok(outgoing)
    }
}
