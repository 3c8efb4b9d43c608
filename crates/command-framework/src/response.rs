//! Handler output.

use platform_client::{Embed, MessageContent};

/// What a handler or hook wants sent back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    /// Message body. `None` sends nothing beyond the acknowledgment.
    pub content: Option<MessageContent>,
    /// Clear the caller's rate-limit entry instead of arming one.
    pub forgive: bool,
    /// Local keys of declared buttons to attach.
    pub buttons: Vec<String>,
}

impl CommandResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(MessageContent::Text(text.into())),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self::embeds(vec![embed])
    }

    pub fn embeds(embeds: Vec<Embed>) -> Self {
        Self {
            content: Some(MessageContent::Embeds(embeds)),
            ..Self::default()
        }
    }

    /// A response with no content.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Don't count this invocation against the caller's rate limit.
    pub fn forgive(mut self) -> Self {
        self.forgive = true;
        self
    }

    /// Attach a declared button by its local key.
    pub fn with_button(mut self, key: impl Into<String>) -> Self {
        self.buttons.push(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}
