//! Chat-platform client seam.
//!
//! The command framework talks to the platform only through
//! [`PlatformClient`]. [`MemoryPlatform`] is a complete in-memory
//! implementation that records every call.

mod client;
mod error;
pub mod memory;
mod types;

pub use client::PlatformClient;
pub use error::PlatformError;
pub use memory::{MemoryPlatform, Operation, PlatformCall, ANY_TARGET};
pub use types::*;
