//! Platform API types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type CommandId = u64;
pub type GuildId = u64;
pub type UserId = u64;
pub type InteractionId = u64;
pub type MessageId = u64;
pub type ChannelId = u64;

/// Maximum length of an embed field value.
pub const FIELD_VALUE_MAX_LENGTH: usize = 1024;

/// Maximum number of fields on a single embed.
pub const EMBED_MAX_FIELDS: usize = 25;

/// Maximum length of a command name.
pub const COMMAND_NAME_MAX_LENGTH: usize = 32;

/// Where a command registration lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "id")]
pub enum Scope {
    Global,
    Guild(GuildId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Guild(id) => write!(f, "guild:{}", id),
        }
    }
}

/// How a command is invoked on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Typed `/name` command.
    Slash,
    /// Context-menu entry on a user.
    User,
    /// Context-menu entry on a message.
    Message,
}

/// Registration payload pushed to the platform on create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: CommandKind,
}

/// A command as currently registered on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub name: String,
}

/// What triggered an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionKind {
    /// A command invocation (slash or context menu).
    Command { name: String, kind: CommandKind },
    /// A button press.
    Button { custom_id: String },
    /// A modal submission with its field values.
    Modal {
        custom_id: String,
        fields: BTreeMap<String, String>,
    },
}

/// A single user-triggered event delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub id: InteractionId,
    pub user_id: UserId,
    /// Guild the interaction happened in, `None` for direct messages.
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub kind: InteractionKind,
    /// Command options keyed by option name.
    pub options: BTreeMap<String, String>,
    /// Whether the caller may manage the guild it invoked from.
    pub can_manage_guild: bool,
}

impl Interaction {
    /// Build a command interaction with no options.
    pub fn command(id: InteractionId, user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            guild_id: None,
            channel_id: 0,
            kind: InteractionKind::Command {
                name: name.into(),
                kind: CommandKind::Slash,
            },
            options: BTreeMap::new(),
            can_manage_guild: false,
        }
    }

    /// Build a button interaction.
    pub fn button(id: InteractionId, user_id: UserId, custom_id: impl Into<String>) -> Self {
        Self {
            kind: InteractionKind::Button {
                custom_id: custom_id.into(),
            },
            ..Self::command(id, user_id, "")
        }
    }

    /// Build a modal submission.
    pub fn modal(
        id: InteractionId,
        user_id: UserId,
        custom_id: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind: InteractionKind::Modal {
                custom_id: custom_id.into(),
                fields,
            },
            ..Self::command(id, user_id, "")
        }
    }

    /// Set the guild this interaction came from.
    pub fn in_guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Mark the caller as allowed to manage the guild.
    pub fn with_manage_guild(mut self) -> Self {
        self.can_manage_guild = true;
        self
    }

    /// Add a command option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Get a command option by name.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

/// A single embed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Rich message embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a non-inline field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Body of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum MessageContent {
    Text(String),
    Embeds(Vec<Embed>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

/// Button component attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

/// Outgoing reply to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub content: MessageContent,
    pub ephemeral: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Button>,
}

/// A message the platform accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
}
