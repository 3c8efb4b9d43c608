//! Per-command, per-user cooldowns.

use dashmap::DashMap;
use platform_client::UserId;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Source of the current time in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

type Key = (String, UserId);

/// Expiry times keyed by (command, user), shared by every dispatcher worker.
pub struct RateLimiter {
    entries: DashMap<Key, i64>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Active expiry of the caller's entry. Expired entries are evicted.
    pub fn expiry(&self, command: &str, user: UserId) -> Option<i64> {
        let key = (command.to_string(), user);
        let now = self.clock.now();
        // Holds the shard lock, so a concurrent arm can't be evicted by mistake.
        let removed = self.entries.remove_if(&key, |_, expires_at| *expires_at <= now);
        if removed.is_some() {
            debug!(command, user, "Rate limit expired");
            return None;
        }
        self.entries.get(&key).map(|e| *e.value())
    }

    /// Whether the caller is still cooling down.
    pub fn is_limited(&self, command: &str, user: UserId) -> bool {
        self.expiry(command, user).is_some()
    }

    /// Start a cooldown unless one is already running. Returns the effective expiry.
    pub fn arm(&self, command: &str, user: UserId, window_secs: u64) -> i64 {
        let now = self.clock.now();
        let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
        let mut entry = self
            .entries
            .entry((command.to_string(), user))
            .or_insert(now.saturating_add(window));
        if *entry <= now {
            *entry = now.saturating_add(window);
        }
        *entry
    }

    /// Forget the caller's cooldown.
    pub fn clear(&self, command: &str, user: UserId) {
        if self.entries.remove(&(command.to_string(), user)).is_some() {
            debug!(command, user, "Rate limit cleared");
        }
    }

    /// Number of stored entries, including ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
