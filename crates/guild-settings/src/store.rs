//! In-memory settings store with coalesced JSON persistence.

use crate::config::SettingsConfig;
use crate::error::SettingsError;
use crate::types::*;
use async_trait::async_trait;
use platform_client::GuildId;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

/// Per-guild settings consulted by the dispatcher.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Whether replies in `guild` default to ephemeral.
    async fn guild_ephemeral_default(&self, guild: GuildId) -> bool;

    /// Change the ephemeral default of `guild`.
    async fn set_guild_ephemeral_default(&self, guild: GuildId, ephemeral: bool);

    /// Drop everything stored for `guild`.
    async fn remove_guild(&self, guild: GuildId);

    /// Drop settings of guilds not in `joined`, returning how many were removed.
    async fn retain_guilds(&self, joined: &[GuildId]) -> usize;

    /// Request a write of the current state; see [`FlushPolicy`].
    async fn schedule_flush(&self);
}

/// When a requested flush is written.
///
/// Requests arriving while a write is pending are absorbed by it. Otherwise the
/// write happens `flush_delay` after the request, pushed back so that two
/// writes are never closer than `min_write_interval`.
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    pub flush_delay: Duration,
    pub min_write_interval: Duration,
}

impl FlushPolicy {
    /// Deadline for a new write, or `None` if a pending write absorbs the request.
    pub fn next_write_at(
        &self,
        now: Instant,
        last_write: Option<Instant>,
        pending: bool,
    ) -> Option<Instant> {
        if pending {
            return None;
        }
        let at = now + self.flush_delay;
        Some(match last_write {
            Some(last) => at.max(last + self.min_write_interval),
            None => at,
        })
    }
}

#[derive(Default)]
struct FlushState {
    pending: bool,
    last_write: Option<Instant>,
}

/// Settings kept in memory and written to a JSON file on request.
#[derive(Clone)]
pub struct JsonSettingsStore {
    data: Arc<RwLock<SettingsData>>,
    flush: Arc<Mutex<FlushState>>,
    write: Arc<Mutex<()>>,
    writes: Arc<AtomicUsize>,
    config: Arc<SettingsConfig>,
}

impl JsonSettingsStore {
    /// Create an empty store.
    pub fn new(config: SettingsConfig) -> Self {
        Self::with_data(config, SettingsData::default())
    }

    /// Create a store, loading the configured file if it exists.
    pub async fn open(config: SettingsConfig) -> Result<Self, SettingsError> {
        let data = match &config.path {
            Some(path) => load(path).await?,
            None => SettingsData::default(),
        };
        info!(guilds = data.guilds.len(), path = ?config.path, "Settings store ready");
        Ok(Self::with_data(config, data))
    }

    fn with_data(config: SettingsConfig, data: SettingsData) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            flush: Arc::new(Mutex::new(FlushState::default())),
            write: Arc::new(Mutex::new(())),
            writes: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }

    fn policy(&self) -> FlushPolicy {
        FlushPolicy {
            flush_delay: self.config.flush_delay,
            min_write_interval: self.config.min_write_interval,
        }
    }

    /// Stored settings of a guild, if any.
    pub async fn guild(&self, guild: GuildId) -> Option<GuildSettings> {
        self.data.read().await.guilds.get(&guild).copied()
    }

    /// Number of completed writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Write the current state immediately. Concurrent writes are serialized.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<(), SettingsError> {
        let Some(path) = self.config.path.as_deref() else {
            return Ok(());
        };
        let _write = self.write.lock().await;

        let bytes = {
            let data = self.data.read().await;
            serde_json::to_vec_pretty(&*data)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // Atomic write
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &bytes).await?;
        fs::rename(&temp_path, path).await?;

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Saved settings ({} bytes) to {:?}", bytes.len(), path);
        Ok(())
    }
}

async fn load(path: &Path) -> Result<SettingsData, SettingsError> {
    if !fs::try_exists(path).await? {
        debug!("No settings file at {:?}, starting empty", path);
        return Ok(SettingsData::default());
    }

    let bytes = fs::read(path).await?;
    let data: SettingsData = serde_json::from_slice(&bytes)?;
    if data.version != DATA_VERSION {
        return Err(SettingsError::Version {
            found: data.version,
            expected: DATA_VERSION,
        });
    }
    Ok(data)
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn guild_ephemeral_default(&self, guild: GuildId) -> bool {
        self.guild(guild)
            .await
            .map(|s| s.only_ephemeral)
            .unwrap_or(self.config.default_guild_ephemeral)
    }

    async fn set_guild_ephemeral_default(&self, guild: GuildId, ephemeral: bool) {
        let mut data = self.data.write().await;
        data.guilds.insert(
            guild,
            GuildSettings {
                only_ephemeral: ephemeral,
            },
        );
        debug!(guild, ephemeral, "Updated guild ephemeral default");
    }

    async fn remove_guild(&self, guild: GuildId) {
        if self.data.write().await.guilds.remove(&guild).is_some() {
            info!(guild, "Removed guild settings");
        }
    }

    async fn retain_guilds(&self, joined: &[GuildId]) -> usize {
        let mut data = self.data.write().await;
        let before = data.guilds.len();
        data.guilds.retain(|id, _| joined.contains(id));
        let removed = before - data.guilds.len();
        if removed > 0 {
            info!(removed, "Pruned settings of departed guilds");
        }
        removed
    }

    async fn schedule_flush(&self) {
        if self.config.path.is_none() {
            return;
        }

        let deadline = {
            let mut flush = self.flush.lock().await;
            let Some(at) = self
                .policy()
                .next_write_at(Instant::now(), flush.last_write, flush.pending)
            else {
                debug!("Flush already pending, request absorbed");
                return;
            };
            flush.pending = true;
            at
        };

        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                // Cleared before serializing so later changes get their own write.
                let mut flush = store.flush.lock().await;
                flush.pending = false;
                flush.last_write = Some(Instant::now());
            }
            if let Err(e) = store.flush().await {
                error!("Failed to write settings: {}", e);
            }
        });
    }
}
