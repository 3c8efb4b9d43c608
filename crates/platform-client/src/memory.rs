//! In-memory platform implementation.
//!
//! Keeps per-scope command tables and a log of every call made against it.
//! Used for local development and as the recording platform in tests.

use crate::client::PlatformClient;
use crate::error::PlatformError;
use crate::types::*;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

/// Failure-injection wildcard matching every target of an operation.
pub const ANY_TARGET: &str = "*";

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    JoinedGuilds,
    List,
    Create,
    Update,
    Delete,
    Acknowledge,
    Reply,
    SendDeferred,
    DeleteMessage,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    List(Scope),
    Create { scope: Scope, name: String },
    Update { scope: Scope, id: CommandId, name: String },
    Delete { scope: Scope, id: CommandId, name: String },
    Acknowledge { interaction: InteractionId, ephemeral: bool },
    Reply { interaction: InteractionId, reply: Reply },
    SendDeferred { interaction: InteractionId, reply: Reply },
    DeleteMessage(MessageId),
}

impl PlatformCall {
    /// Whether this call changed the remote command set.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            PlatformCall::Create { .. } | PlatformCall::Update { .. } | PlatformCall::Delete { .. }
        )
    }

    /// Reply content carried by this call, if any.
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            PlatformCall::Reply { reply, .. } | PlatformCall::SendDeferred { reply, .. } => {
                Some(reply)
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct State {
    guilds: Vec<GuildId>,
    commands: BTreeMap<Scope, Vec<RemoteCommand>>,
    next_id: u64,
    calls: Vec<PlatformCall>,
    acknowledged: HashSet<InteractionId>,
    failures: HashSet<(Operation, String)>,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, op: Operation, target: &str) -> Result<(), PlatformError> {
        if self.failures.contains(&(op, target.to_string()))
            || self.failures.contains(&(op, ANY_TARGET.to_string()))
        {
            return Err(PlatformError::Api {
                status: 500,
                message: format!("injected {:?} failure for {}", op, target),
            });
        }
        Ok(())
    }

    fn name_of(&self, scope: Scope, id: CommandId) -> Option<String> {
        self.commands
            .get(&scope)
            .and_then(|cmds| cmds.iter().find(|c| c.id == id))
            .map(|c| c.name.clone())
    }
}

/// In-memory platform.
#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl MemoryPlatform {
    /// Create an empty platform with no guilds and no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a platform where the bot has joined the given guilds.
    pub fn with_guilds(guilds: impl IntoIterator<Item = GuildId>) -> Self {
        let state = State {
            guilds: guilds.into_iter().collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn join_guild(&self, guild: GuildId) {
        let mut state = self.state.lock().await;
        if !state.guilds.contains(&guild) {
            state.guilds.push(guild);
        }
    }

    pub async fn leave_guild(&self, guild: GuildId) {
        let mut state = self.state.lock().await;
        state.guilds.retain(|g| *g != guild);
        state.commands.remove(&Scope::Guild(guild));
    }

    /// Register a command directly, bypassing the call log.
    pub async fn seed_command(&self, scope: Scope, name: impl Into<String>) -> CommandId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.commands.entry(scope).or_default().push(RemoteCommand {
            id,
            name: name.into(),
        });
        id
    }

    /// Make `op` fail for `target` (command name, scope, or interaction id).
    pub async fn fail(&self, op: Operation, target: impl Into<String>) {
        self.state.lock().await.failures.insert((op, target.into()));
    }

    /// Remove every injected failure.
    pub async fn heal(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Command names registered in a scope, sorted.
    pub async fn command_names(&self, scope: Scope) -> Vec<String> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state
            .commands
            .get(&scope)
            .map(|cmds| cmds.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls that created, updated or deleted a registration.
    pub async fn mutations(&self) -> Vec<PlatformCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Replies sent for an interaction, in order.
    pub async fn replies_for(&self, interaction: InteractionId) -> Vec<Reply> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Reply { interaction: i, reply }
                | PlatformCall::SendDeferred { interaction: i, reply }
                    if *i == interaction =>
                {
                    Some(reply.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn joined_guilds(&self) -> Result<Vec<GuildId>, PlatformError> {
        let state = self.state.lock().await;
        state.check(Operation::JoinedGuilds, ANY_TARGET)?;
        Ok(state.guilds.clone())
    }

    async fn list_registered_commands(
        &self,
        scope: Scope,
    ) -> Result<Vec<RemoteCommand>, PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::List(scope));
        state.check(Operation::List, &scope.to_string())?;
        Ok(state.commands.get(&scope).cloned().unwrap_or_default())
    }

    async fn create_command(
        &self,
        scope: Scope,
        spec: &CommandSpec,
    ) -> Result<CommandId, PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::Create {
            scope,
            name: spec.name.clone(),
        });
        state.check(Operation::Create, &spec.name)?;

        let id = state.allocate_id();
        let cmds = state.commands.entry(scope).or_default();
        // Creating an existing name overwrites it, as the real upsert does.
        cmds.retain(|c| c.name != spec.name);
        cmds.push(RemoteCommand {
            id,
            name: spec.name.clone(),
        });
        debug!(%scope, name = %spec.name, id, "Created command");
        Ok(id)
    }

    async fn update_command(
        &self,
        scope: Scope,
        id: CommandId,
        spec: &CommandSpec,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::Update {
            scope,
            id,
            name: spec.name.clone(),
        });
        state.check(Operation::Update, &spec.name)?;

        let cmd = state
            .commands
            .get_mut(&scope)
            .and_then(|cmds| cmds.iter_mut().find(|c| c.id == id))
            .ok_or(PlatformError::NotFound {
                kind: "command",
                id,
            })?;
        cmd.name = spec.name.clone();
        Ok(())
    }

    async fn delete_command(&self, scope: Scope, id: CommandId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        let name = state.name_of(scope, id).unwrap_or_default();
        state.calls.push(PlatformCall::Delete {
            scope,
            id,
            name: name.clone(),
        });
        state.check(Operation::Delete, &name)?;

        let cmds = state.commands.get_mut(&scope).ok_or(PlatformError::NotFound {
            kind: "command",
            id,
        })?;
        let before = cmds.len();
        cmds.retain(|c| c.id != id);
        if cmds.len() == before {
            return Err(PlatformError::NotFound {
                kind: "command",
                id,
            });
        }
        Ok(())
    }

    async fn acknowledge(
        &self,
        interaction: InteractionId,
        ephemeral: bool,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::Acknowledge {
            interaction,
            ephemeral,
        });
        state.check(Operation::Acknowledge, &interaction.to_string())?;
        if !state.acknowledged.insert(interaction) {
            return Err(PlatformError::AlreadyAcknowledged(interaction));
        }
        Ok(())
    }

    async fn reply(
        &self,
        interaction: InteractionId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::Reply {
            interaction,
            reply: reply.clone(),
        });
        state.check(Operation::Reply, &interaction.to_string())?;
        if !state.acknowledged.insert(interaction) {
            return Err(PlatformError::AlreadyAcknowledged(interaction));
        }
        Ok(SentMessage {
            id: state.allocate_id(),
            channel_id: 0,
        })
    }

    async fn send_deferred(
        &self,
        interaction: InteractionId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::SendDeferred {
            interaction,
            reply: reply.clone(),
        });
        state.check(Operation::SendDeferred, &interaction.to_string())?;
        if !state.acknowledged.contains(&interaction) {
            return Err(PlatformError::NotFound {
                kind: "interaction",
                id: interaction,
            });
        }
        Ok(SentMessage {
            id: state.allocate_id(),
            channel_id: 0,
        })
    }

    async fn delete_message(&self, message: SentMessage) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::DeleteMessage(message.id));
        state.check(Operation::DeleteMessage, &message.id.to_string())
    }
}
