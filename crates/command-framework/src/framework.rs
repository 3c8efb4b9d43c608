//! Framework facade wiring the registry, synchronizer and dispatcher together.

use crate::builtin;
use crate::config::FrameworkConfig;
use crate::descriptor::CommandDescriptor;
use crate::dispatch::{Dispatcher, Outcome};
use crate::error::ConfigError;
use crate::registry::{CommandRegistry, RegisterReport};
use crate::sync::{RegistrationSynchronizer, SyncReport};
use guild_settings::SettingsStore;
use platform_client::{GuildId, Interaction, PlatformClient};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A configured command framework for one bot.
pub struct Framework {
    config: FrameworkConfig,
    registry: Arc<CommandRegistry>,
    register_report: RegisterReport,
    synchronizer: Arc<RegistrationSynchronizer>,
    dispatcher: Dispatcher,
    platform: Arc<dyn PlatformClient>,
    settings: Arc<dyn SettingsStore>,
}

impl Framework {
    /// Register `descriptors` (after the built-ins, when enabled) and build the
    /// synchronizer and dispatcher. A declared command named like a built-in
    /// replaces it.
    pub fn new(
        config: FrameworkConfig,
        platform: Arc<dyn PlatformClient>,
        settings: Arc<dyn SettingsStore>,
        descriptors: Vec<CommandDescriptor>,
    ) -> Result<Self, ConfigError> {
        let mut commands = Vec::with_capacity(descriptors.len() + 2);
        if config.bot.register_default_commands {
            commands.extend(builtin::default_commands(&config.about)?);
        }
        commands.extend(descriptors);

        let mut registry = CommandRegistry::new();
        let register_report = registry.register(commands);
        let registry = Arc::new(registry);

        let synchronizer = Arc::new(RegistrationSynchronizer::new(
            platform.clone(),
            registry.clone(),
            config.bot.update_commands_on_launch,
        ));
        let dispatcher = Dispatcher::new(registry.clone(), platform.clone(), settings.clone())
            .with_max_concurrency(config.dispatch.max_concurrent_interactions);

        Ok(Self {
            config,
            registry,
            register_report,
            synchronizer,
            dispatcher,
            platform,
            settings,
        })
    }

    /// Run the launch sync pass over the global scope and every joined guild,
    /// then drop settings of guilds the bot has left while offline.
    pub async fn start(&self) -> SyncReport {
        info!("Starting command framework with {} commands", self.registry.len());
        let report = self.synchronizer.sync_all().await;
        self.prune_settings().await;
        report
    }

    async fn prune_settings(&self) {
        match self.platform.joined_guilds().await {
            Ok(joined) => {
                if self.settings.retain_guilds(&joined).await > 0 {
                    self.settings.schedule_flush().await;
                }
            }
            Err(e) => warn!("Skipping settings cleanup, failed to list guilds: {}", e),
        }
    }

    pub async fn guild_joined(&self, guild: GuildId) -> SyncReport {
        self.synchronizer.guild_joined(guild).await
    }

    /// Forget the guild's command ids and drop its settings.
    pub async fn guild_left(&self, guild: GuildId) {
        self.synchronizer.guild_left(guild).await;
        self.settings.remove_guild(guild).await;
        self.settings.schedule_flush().await;
    }

    pub fn dispatch(&self, interaction: Interaction) -> JoinHandle<Outcome> {
        self.dispatcher.dispatch(interaction)
    }

    pub async fn serve<S>(&self, events: S) -> usize
    where
        S: Stream<Item = Interaction>,
    {
        self.dispatcher.serve(events).await
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Result of registering the declared commands, including name collisions.
    pub fn register_report(&self) -> &RegisterReport {
        &self.register_report
    }

    pub fn synchronizer(&self) -> &Arc<RegistrationSynchronizer> {
        &self.synchronizer
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
