//! Framework error types.

use platform_client::{PlatformError, Scope};
use std::fmt;
use thiserror::Error;

/// Invalid command declaration. Raised while building descriptors, before
/// anything is registered or dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Command name must not be empty")]
    EmptyName,

    #[error("Command name '{name}' exceeds {max} characters")]
    NameTooLong { name: String, max: usize },

    #[error("Command name '{0}' contains the reserved component delimiter '_'")]
    ReservedDelimiter(String),

    #[error("Slash command '{0}' requires a description")]
    MissingDescription(String),

    #[error("Command '{name}' enables {feature} with a zero-second window")]
    NonPositiveWindow { name: String, feature: &'static str },

    #[error("Command '{name}' declares button '{key}' twice")]
    DuplicateComponentKey { name: String, key: String },
}

/// The dispatcher or router could not find who owns an interaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command '{name}' is registered as {expected:?}, invoked as {actual:?}")]
    KindMismatch {
        name: String,
        expected: platform_client::CommandKind,
        actual: platform_client::CommandKind,
    },

    #[error("Malformed component id: {0}")]
    MalformedComponentId(String),

    #[error("No command owns component '{id}' (owner '{owner}')")]
    UnknownComponentOwner { id: String, owner: String },

    #[error("Command '{command}' has no {capability} handler")]
    MissingCapability {
        command: String,
        capability: Capability,
    },
}

/// Optional command capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Button,
    Modal,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Button => write!(f, "button"),
            Capability::Modal => write!(f, "modal"),
        }
    }
}

/// Remote call issued by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    /// Listing the guilds the bot is in.
    Guilds,
    List,
    Create,
    Update,
    Delete,
}

/// A single remote registration call failed. Synchronization carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{op:?} of '{command}' in {scope} failed: {source}")]
pub struct RegistrationError {
    pub scope: Scope,
    pub op: SyncOp,
    /// Command name, empty for list and guild calls.
    pub command: String,
    #[source]
    pub source: PlatformError,
}

/// Why an interaction could not be answered.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}
