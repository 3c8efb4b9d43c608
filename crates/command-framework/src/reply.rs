//! Turning handler output into platform replies.

use crate::descriptor::{CommandDescriptor, OutputKind};
use crate::response::CommandResponse;
use anyhow::{anyhow, bail};
use platform_client::{Embed, MessageContent, Reply, EMBED_MAX_FIELDS, FIELD_VALUE_MAX_LENGTH};

pub const ERROR_TITLE: &str = "Command Failed To Execute";
pub const ERROR_COLOR: u32 = 0xFF0000;
pub const INACTIVE_MESSAGE: &str = "This command is currently not active";

/// Build the reply for `response`, enforcing the command's output kind and
/// resolving button keys. `None` when there is nothing to send.
pub fn build_reply(
    command: &CommandDescriptor,
    response: &CommandResponse,
    ephemeral: bool,
) -> anyhow::Result<Option<Reply>> {
    assemble(command, response, ephemeral, true)
}

/// Like [`build_reply`] for button and modal responses, which may use either
/// output kind.
pub fn component_reply(
    command: &CommandDescriptor,
    response: &CommandResponse,
    ephemeral: bool,
) -> anyhow::Result<Option<Reply>> {
    assemble(command, response, ephemeral, false)
}

fn assemble(
    command: &CommandDescriptor,
    response: &CommandResponse,
    ephemeral: bool,
    check_output: bool,
) -> anyhow::Result<Option<Reply>> {
    let Some(content) = response.content.clone() else {
        if !response.buttons.is_empty() {
            bail!("command '{}' attached buttons to an empty response", command.name());
        }
        return Ok(None);
    };

    match (command.output(), &content) {
        _ if !check_output => {}
        (OutputKind::Embed, MessageContent::Text(_)) => {
            bail!("command '{}' is embed-only but produced text", command.name())
        }
        (OutputKind::Text, MessageContent::Embeds(_)) => {
            bail!("command '{}' is text-only but produced embeds", command.name())
        }
        _ => {}
    }

    let components = response
        .buttons
        .iter()
        .map(|key| {
            command
                .button(key)
                .ok_or_else(|| anyhow!("command '{}' has no button '{}'", command.name(), key))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Some(Reply {
        content,
        ephemeral,
        components,
    }))
}

/// A plain notice in the command's output kind.
fn notice(command: &CommandDescriptor, title: Option<&str>, text: String) -> CommandResponse {
    match command.output() {
        OutputKind::Text => CommandResponse::text(text),
        OutputKind::Embed => {
            let mut embed = Embed::new().description(text);
            if let Some(title) = title {
                embed = embed.title(title).color(ERROR_COLOR);
            }
            CommandResponse::embed(embed)
        }
    }
}

/// Canned reply for inactive commands.
pub fn inactive_response(command: &CommandDescriptor) -> CommandResponse {
    notice(command, None, INACTIVE_MESSAGE.to_string())
}

/// Cooldown notice for a rate-limited caller.
pub fn cooldown_response(command: &CommandDescriptor, expiry: i64, now: i64) -> CommandResponse {
    notice(
        command,
        Some("Rate Limited"),
        format!(
            "You are still rate limited. Expires <t:{}:R> (in {} seconds).",
            expiry,
            expiry - now
        ),
    )
}

fn truncate(text: &str) -> String {
    if text.chars().count() > FIELD_VALUE_MAX_LENGTH {
        text.chars().take(FIELD_VALUE_MAX_LENGTH).collect()
    } else {
        text.to_string()
    }
}

/// Standard error payload: the error message plus one field per cause.
pub fn error_embed(error: &anyhow::Error) -> Embed {
    let mut embed = Embed::new()
        .title(ERROR_TITLE)
        .description("The command failed to execute.")
        .color(ERROR_COLOR)
        .field("Error Message", truncate(&error.to_string()));

    for (i, cause) in error.chain().skip(1).enumerate() {
        if embed.fields.len() >= EMBED_MAX_FIELDS {
            break;
        }
        embed = embed.field(format!("Error Stack {}", i), truncate(&cause.to_string()));
    }
    embed
}

/// Reply carrying the error payload.
pub fn error_reply(error: &anyhow::Error, ephemeral: bool) -> Reply {
    Reply {
        content: MessageContent::Embeds(vec![error_embed(error)]),
        ephemeral,
        components: vec![],
    }
}
