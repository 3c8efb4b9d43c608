//! Per-guild bot settings.
//!
//! Settings live in memory and are written to a JSON file on request. Writes
//! are coalesced so bursts of changes produce a single write.

mod config;
mod error;
mod store;
mod types;

pub use config::SettingsConfig;
pub use error::SettingsError;
pub use store::{FlushPolicy, JsonSettingsStore, SettingsStore};
pub use types::*;
