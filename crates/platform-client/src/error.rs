//! Platform client errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Unknown {kind}: {id}")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Interaction {0} already acknowledged")]
    AlreadyAcknowledged(u64),

    #[error("Interaction {0} expired before a response was sent")]
    InteractionExpired(u64),

    #[error("Transport error: {0}")]
    Transport(String),
}
