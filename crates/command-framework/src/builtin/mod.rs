//! Built-in commands.

mod about;
mod help;
mod settings;

pub use about::AboutHandler;
pub use help::HelpHandler;
pub use settings::SettingsHandler;

use crate::config::AboutConfig;
use crate::descriptor::CommandDescriptor;
use crate::error::ConfigError;

/// The `about`, `help` and `settings` commands.
pub fn default_commands(about: &AboutConfig) -> Result<Vec<CommandDescriptor>, ConfigError> {
    Ok(vec![
        about::descriptor(about.clone())?,
        help::descriptor()?,
        settings::descriptor()?,
    ])
}
