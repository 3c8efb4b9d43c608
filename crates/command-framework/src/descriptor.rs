//! Command descriptors.
//!
//! A [`CommandDescriptor`] is the immutable definition of one command. It is
//! only constructible through [`CommandBuilder`], whose `build()` validates
//! the whole definition at once.

use crate::component::ComponentKey;
use crate::error::{Capability, ConfigError};
use crate::handler::{ButtonHandler, CommandHandler, ModalHandler};
use crate::hooks::{CommandHook, HookChain};
use platform_client::{
    Button, ButtonStyle, CommandKind, CommandSpec, GuildId, COMMAND_NAME_MAX_LENGTH,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Where a command is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Global,
    /// Registered per guild. An empty allow-list means every joined guild.
    Guild { allow_list: BTreeSet<GuildId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Acknowledge first, send content later.
    Deferred,
    /// Reply directly before the platform deadline.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Embed,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemeralPolicy {
    /// Always reply ephemerally.
    Forced,
    /// Follow the caller's context (inactive flag, guild default).
    CallerContext,
}

/// A button the command may attach to its replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub key: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

/// Immutable command definition.
pub struct CommandDescriptor {
    name: String,
    description: Option<String>,
    kind: CommandKind,
    visibility: Visibility,
    reply_mode: ReplyMode,
    output: OutputKind,
    ephemeral: EphemeralPolicy,
    active: bool,
    rate_limit_secs: u64,
    message_expiry_secs: u64,
    forgive_on_error: bool,
    hooks: HookChain,
    buttons: Vec<ButtonSpec>,
    handler: Arc<dyn CommandHandler>,
    button_handler: Option<Arc<dyn ButtonHandler>>,
    modal_handler: Option<Arc<dyn ModalHandler>>,
}

impl CommandDescriptor {
    /// Start declaring a command.
    pub fn builder(name: impl Into<String>, handler: impl CommandHandler + 'static) -> CommandBuilder {
        CommandBuilder::new(name, Arc::new(handler))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn reply_mode(&self) -> ReplyMode {
        self.reply_mode
    }

    pub fn output(&self) -> OutputKind {
        self.output
    }

    pub fn ephemeral_policy(&self) -> EphemeralPolicy {
        self.ephemeral
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_guild_scoped(&self) -> bool {
        matches!(self.visibility, Visibility::Guild { .. })
    }

    /// Whether this command belongs in `guild`'s scope.
    pub fn is_eligible_for(&self, guild: GuildId) -> bool {
        match &self.visibility {
            Visibility::Global => false,
            Visibility::Guild { allow_list } => allow_list.is_empty() || allow_list.contains(&guild),
        }
    }

    /// Rate-limit window in seconds, `None` when disabled.
    pub fn rate_limit(&self) -> Option<u64> {
        (self.rate_limit_secs > 0).then_some(self.rate_limit_secs)
    }

    /// Message-expiry window in seconds, `None` when disabled.
    pub fn message_expiry(&self) -> Option<u64> {
        (self.message_expiry_secs > 0).then_some(self.message_expiry_secs)
    }

    pub fn forgives_on_error(&self) -> bool {
        self.forgive_on_error
    }

    pub fn hooks(&self) -> &HookChain {
        &self.hooks
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    pub fn button_handler(&self) -> Option<&Arc<dyn ButtonHandler>> {
        self.button_handler.as_ref()
    }

    pub fn modal_handler(&self) -> Option<&Arc<dyn ModalHandler>> {
        self.modal_handler.as_ref()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Button => self.button_handler.is_some(),
            Capability::Modal => self.modal_handler.is_some(),
        }
    }

    /// Full component id for one of this command's local keys.
    pub fn component_id(&self, key: &str) -> String {
        ComponentKey::new(&self.name, key).to_string()
    }

    /// Declared buttons.
    pub fn buttons(&self) -> &[ButtonSpec] {
        &self.buttons
    }

    /// Materialize a declared button, `None` if `key` was never declared.
    pub fn button(&self, key: &str) -> Option<Button> {
        self.buttons.iter().find(|b| b.key == key).map(|b| Button {
            custom_id: self.component_id(&b.key),
            label: b.label.clone(),
            style: b.style,
            disabled: b.disabled,
        })
    }

    /// Registration payload sent to the platform.
    pub fn spec(&self) -> CommandSpec {
        CommandSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind,
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("reply_mode", &self.reply_mode)
            .field("output", &self.output)
            .field("ephemeral", &self.ephemeral)
            .field("active", &self.active)
            .field("rate_limit_secs", &self.rate_limit_secs)
            .field("message_expiry_secs", &self.message_expiry_secs)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandDescriptor`].
///
/// Defaults: slash command, global, immediate reply, embed output, ephemeral
/// follows the caller's context, active, no rate limit, no message expiry.
pub struct CommandBuilder {
    name: String,
    description: Option<String>,
    kind: CommandKind,
    visibility: Visibility,
    reply_mode: ReplyMode,
    output: OutputKind,
    ephemeral: EphemeralPolicy,
    active: bool,
    rate_limit: Option<u64>,
    message_expiry: Option<u64>,
    forgive_on_error: bool,
    hooks: Vec<Arc<dyn CommandHook>>,
    buttons: Vec<ButtonSpec>,
    handler: Arc<dyn CommandHandler>,
    button_handler: Option<Arc<dyn ButtonHandler>>,
    modal_handler: Option<Arc<dyn ModalHandler>>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: CommandKind::Slash,
            visibility: Visibility::Global,
            reply_mode: ReplyMode::Immediate,
            output: OutputKind::Embed,
            ephemeral: EphemeralPolicy::CallerContext,
            active: true,
            rate_limit: None,
            message_expiry: None,
            forgive_on_error: false,
            hooks: Vec::new(),
            buttons: Vec::new(),
            handler,
            button_handler: None,
            modal_handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Register per guild, in every joined guild.
    pub fn guild_scoped(mut self) -> Self {
        self.visibility = Visibility::Guild {
            allow_list: BTreeSet::new(),
        };
        self
    }

    /// Register per guild, only in the listed guilds.
    pub fn guilds(mut self, guilds: impl IntoIterator<Item = GuildId>) -> Self {
        self.visibility = Visibility::Guild {
            allow_list: guilds.into_iter().collect(),
        };
        self
    }

    pub fn deferred(mut self) -> Self {
        self.reply_mode = ReplyMode::Deferred;
        self
    }

    pub fn reply_mode(mut self, mode: ReplyMode) -> Self {
        self.reply_mode = mode;
        self
    }

    pub fn text_output(mut self) -> Self {
        self.output = OutputKind::Text;
        self
    }

    pub fn output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    pub fn force_ephemeral(mut self) -> Self {
        self.ephemeral = EphemeralPolicy::Forced;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Enable rate limiting with a window of `secs` seconds.
    pub fn rate_limit(mut self, secs: u64) -> Self {
        self.rate_limit = Some(secs);
        self
    }

    /// Delete sent replies after `secs` seconds.
    pub fn message_expiry(mut self, secs: u64) -> Self {
        self.message_expiry = Some(secs);
        self
    }

    /// Clear the caller's rate-limit entry when execution fails.
    pub fn forgive_on_error(mut self) -> Self {
        self.forgive_on_error = true;
        self
    }

    pub fn hook(mut self, hook: impl CommandHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn button(mut self, key: impl Into<String>, style: ButtonStyle, label: impl Into<String>) -> Self {
        self.buttons.push(ButtonSpec {
            key: key.into(),
            label: label.into(),
            style,
            disabled: false,
        });
        self
    }

    /// Declare a button that is shown but can't be pressed.
    pub fn disabled_button(
        mut self,
        key: impl Into<String>,
        style: ButtonStyle,
        label: impl Into<String>,
    ) -> Self {
        self.buttons.push(ButtonSpec {
            key: key.into(),
            label: label.into(),
            style,
            disabled: true,
        });
        self
    }

    pub fn on_button(mut self, handler: impl ButtonHandler + 'static) -> Self {
        self.button_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_modal(mut self, handler: impl ModalHandler + 'static) -> Self {
        self.modal_handler = Some(Arc::new(handler));
        self
    }

    /// Check the definition without building it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.name.chars().count() > COMMAND_NAME_MAX_LENGTH {
            return Err(ConfigError::NameTooLong {
                name: self.name.clone(),
                max: COMMAND_NAME_MAX_LENGTH,
            });
        }
        if self.name.contains(ComponentKey::DELIMITER) {
            return Err(ConfigError::ReservedDelimiter(self.name.clone()));
        }

        let has_description = self
            .description
            .as_deref()
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false);
        if self.kind == CommandKind::Slash && !has_description {
            return Err(ConfigError::MissingDescription(self.name.clone()));
        }

        if self.rate_limit == Some(0) {
            return Err(ConfigError::NonPositiveWindow {
                name: self.name.clone(),
                feature: "rate limiting",
            });
        }
        if self.message_expiry == Some(0) {
            return Err(ConfigError::NonPositiveWindow {
                name: self.name.clone(),
                feature: "message expiry",
            });
        }

        let mut keys = BTreeSet::new();
        for button in &self.buttons {
            if !keys.insert(button.key.as_str()) {
                return Err(ConfigError::DuplicateComponentKey {
                    name: self.name.clone(),
                    key: button.key.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn build(self) -> Result<CommandDescriptor, ConfigError> {
        self.validate()?;

        Ok(CommandDescriptor {
            name: self.name,
            description: self.description,
            kind: self.kind,
            visibility: self.visibility,
            reply_mode: self.reply_mode,
            output: self.output,
            ephemeral: self.ephemeral,
            active: self.active,
            rate_limit_secs: self.rate_limit.unwrap_or(0),
            message_expiry_secs: self.message_expiry.unwrap_or(0),
            forgive_on_error: self.forgive_on_error,
            hooks: HookChain::new(self.hooks),
            buttons: self.buttons,
            handler: self.handler,
            button_handler: self.button_handler,
            modal_handler: self.modal_handler,
        })
    }
}
