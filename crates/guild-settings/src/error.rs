//! Settings store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported settings version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}
