//! Remote registration synchronization.
//!
//! Each pass converges one scope's remote command set to the local registry:
//! matched names keep their ids, stale remote commands are deleted and missing
//! ones created. Remote calls are independent; one failing never stops the
//! others.

use crate::descriptor::CommandDescriptor;
use crate::error::{RegistrationError, SyncOp};
use crate::registry::CommandRegistry;
use platform_client::{CommandId, GuildId, PlatformClient, PlatformError, Scope};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Callback receiving every registration failure.
pub type RegistrationErrorHandler = Arc<dyn Fn(&RegistrationError) + Send + Sync>;

/// Counters of one or more sync passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failures: Vec<RegistrationError>,
}

impl SyncReport {
    pub fn merge(&mut self, other: SyncReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.failures.extend(other.failures);
    }

    /// Whether the pass issued no create, update or delete calls.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Remote ids of the commands registered by the last passes, per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisteredIds {
    scopes: BTreeMap<Scope, BTreeMap<String, CommandId>>,
}

impl RegisteredIds {
    pub fn global_id(&self, name: &str) -> Option<CommandId> {
        self.get(Scope::Global, name)
    }

    pub fn guild_id(&self, name: &str, guild: GuildId) -> Option<CommandId> {
        self.get(Scope::Guild(guild), name)
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<CommandId> {
        self.scopes.get(&scope).and_then(|ids| ids.get(name)).copied()
    }

    /// Every recorded name in a scope with its id.
    pub fn scope(&self, scope: Scope) -> Option<&BTreeMap<String, CommandId>> {
        self.scopes.get(&scope)
    }

    /// Guilds with at least one recorded id.
    pub fn guilds(&self) -> Vec<GuildId> {
        self.scopes
            .keys()
            .filter_map(|scope| match scope {
                Scope::Guild(guild) => Some(*guild),
                Scope::Global => None,
            })
            .collect()
    }
}

/// Keeps the platform's registered commands in step with the registry.
pub struct RegistrationSynchronizer {
    platform: Arc<dyn PlatformClient>,
    registry: Arc<CommandRegistry>,
    update_on_launch: bool,
    launched: AtomicBool,
    ids: RwLock<RegisteredIds>,
    on_error: RegistrationErrorHandler,
}

impl RegistrationSynchronizer {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        registry: Arc<CommandRegistry>,
        update_on_launch: bool,
    ) -> Self {
        Self {
            platform,
            registry,
            update_on_launch,
            launched: AtomicBool::new(false),
            ids: RwLock::new(RegisteredIds::default()),
            on_error: Arc::new(|err: &RegistrationError| {
                error!(error = %err, "Command registration failed")
            }),
        }
    }

    /// Replace the default error logging.
    pub fn with_error_handler(mut self, handler: RegistrationErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    /// Converge the global scope, then every joined guild.
    ///
    /// The first call is the launch pass: when update-on-launch is set it also
    /// pushes every matched command's current definition.
    pub async fn sync_all(&self) -> SyncReport {
        let update = self.update_on_launch && !self.launched.swap(true, Ordering::SeqCst);
        let mut report = self.converge(Scope::Global, update).await;

        match self.platform.joined_guilds().await {
            Ok(guilds) => {
                for guild in guilds {
                    report.merge(self.converge(Scope::Guild(guild), update).await);
                }
            }
            Err(source) => self.report_failure(
                &mut report,
                Self::failure(Scope::Global, SyncOp::Guilds, "", source),
            ),
        }

        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failures = report.failures.len(),
            "Command sync complete"
        );
        report
    }

    /// Converge a single scope. Never issues updates.
    pub async fn sync_scope(&self, scope: Scope) -> SyncReport {
        self.converge(scope, false).await
    }

    /// Register eligible guild commands in a newly joined guild.
    pub async fn guild_joined(&self, guild: GuildId) -> SyncReport {
        info!(guild, "Joined guild, syncing commands");
        self.converge(Scope::Guild(guild), false).await
    }

    /// Forget the ids recorded for a guild the bot has left.
    pub async fn guild_left(&self, guild: GuildId) {
        if self.ids.write().await.scopes.remove(&Scope::Guild(guild)).is_some() {
            info!(guild, "Left guild, forgot its command ids");
        }
    }

    /// Snapshot of the recorded ids.
    pub async fn registered_ids(&self) -> RegisteredIds {
        self.ids.read().await.clone()
    }

    fn eligible(&self, scope: Scope) -> Vec<Arc<CommandDescriptor>> {
        match scope {
            Scope::Global => self.registry.global(),
            Scope::Guild(guild) => self
                .registry
                .guild_scoped()
                .into_iter()
                .filter(|c| c.is_eligible_for(guild))
                .collect(),
        }
    }

    fn report_failure(&self, report: &mut SyncReport, err: RegistrationError) {
        (self.on_error)(&err);
        report.failures.push(err);
    }

    fn failure(scope: Scope, op: SyncOp, command: &str, source: PlatformError) -> RegistrationError {
        RegistrationError {
            scope,
            op,
            command: command.to_string(),
            source,
        }
    }

    async fn converge(&self, scope: Scope, update: bool) -> SyncReport {
        let mut report = SyncReport::default();

        let remote = match self.platform.list_registered_commands(scope).await {
            Ok(remote) => remote,
            Err(source) => {
                self.report_failure(&mut report, Self::failure(scope, SyncOp::List, "", source));
                return report;
            }
        };

        let eligible = self.eligible(scope);
        let wanted: HashSet<&str> = eligible.iter().map(|c| c.name()).collect();
        let mut recorded: BTreeMap<String, CommandId> = BTreeMap::new();

        for command in remote {
            let keep = wanted.contains(command.name.as_str()) && !recorded.contains_key(&command.name);
            if keep {
                if update {
                    if let Some(descriptor) = self.registry.get(&command.name) {
                        match self
                            .platform
                            .update_command(scope, command.id, &descriptor.spec())
                            .await
                        {
                            Ok(()) => report.updated += 1,
                            Err(source) => self.report_failure(
                                &mut report,
                                Self::failure(scope, SyncOp::Update, &command.name, source),
                            ),
                        }
                    }
                }
                recorded.insert(command.name, command.id);
                continue;
            }

            debug!(%scope, name = %command.name, id = command.id, "Deleting stale command");
            match self.platform.delete_command(scope, command.id).await {
                Ok(()) => report.deleted += 1,
                Err(source) => self.report_failure(
                    &mut report,
                    Self::failure(scope, SyncOp::Delete, &command.name, source),
                ),
            }
        }

        for descriptor in &eligible {
            if recorded.contains_key(descriptor.name()) {
                continue;
            }
            match self.platform.create_command(scope, &descriptor.spec()).await {
                Ok(id) => {
                    debug!(%scope, name = descriptor.name(), id, "Created command");
                    report.created += 1;
                    recorded.insert(descriptor.name().to_string(), id);
                }
                Err(source) => self.report_failure(
                    &mut report,
                    Self::failure(scope, SyncOp::Create, descriptor.name(), source),
                ),
            }
        }

        let mut ids = self.ids.write().await;
        if recorded.is_empty() {
            ids.scopes.remove(&scope);
        } else {
            ids.scopes.insert(scope, recorded);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::response::CommandResponse;
    use platform_client::{MemoryPlatform, Operation, PlatformCall, ANY_TARGET};
    use std::sync::Mutex;

    fn global(name: &str) -> crate::CommandDescriptor {
        crate::CommandDescriptor::builder(name, handler_fn(|_| Ok(CommandResponse::empty())))
            .description(name)
            .build()
            .unwrap()
    }

    fn guild_only(name: &str, guilds: &[GuildId]) -> crate::CommandDescriptor {
        crate::CommandDescriptor::builder(name, handler_fn(|_| Ok(CommandResponse::empty())))
            .description(name)
            .guilds(guilds.iter().copied())
            .build()
            .unwrap()
    }

    fn setup(
        platform: MemoryPlatform,
        commands: Vec<crate::CommandDescriptor>,
        update_on_launch: bool,
    ) -> (Arc<MemoryPlatform>, RegistrationSynchronizer) {
        let platform = Arc::new(platform);
        let mut registry = CommandRegistry::new();
        registry.register(commands);
        let sync = RegistrationSynchronizer::new(platform.clone(), Arc::new(registry), update_on_launch);
        (platform, sync)
    }

    #[tokio::test]
    async fn test_converges_global_scope() {
        let (platform, sync) = setup(
            MemoryPlatform::new(),
            vec![global("a"), global("b"), global("c")],
            false,
        );
        let a = platform.seed_command(Scope::Global, "a").await;
        platform.seed_command(Scope::Global, "d").await;

        let report = sync.sync_all().await;

        assert_eq!(platform.command_names(Scope::Global).await, vec!["a", "b", "c"]);
        assert_eq!(report.created, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.updated, 0);

        let ids = sync.registered_ids().await;
        assert_eq!(ids.global_id("a"), Some(a));
        assert!(ids.global_id("b").is_some());
        assert_eq!(ids.global_id("d"), None);
    }

    #[tokio::test]
    async fn test_second_pass_is_noop() {
        let (platform, sync) = setup(
            MemoryPlatform::with_guilds([1]),
            vec![global("a"), guild_only("b", &[])],
            true,
        );
        platform.seed_command(Scope::Global, "a").await;

        let first = sync.sync_all().await;
        assert_eq!(first.updated, 1);

        platform.clear_calls().await;
        let second = sync.sync_all().await;

        assert!(second.is_noop());
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_allow_list_limits_guilds() {
        let (platform, sync) = setup(
            MemoryPlatform::with_guilds([1, 2]),
            vec![guild_only("mod", &[1])],
            false,
        );
        platform.seed_command(Scope::Guild(2), "mod").await;

        sync.sync_all().await;

        assert_eq!(platform.command_names(Scope::Guild(1)).await, vec!["mod"]);
        assert!(platform.command_names(Scope::Guild(2)).await.is_empty());
        assert!(platform.command_names(Scope::Global).await.is_empty());

        let ids = sync.registered_ids().await;
        assert!(ids.guild_id("mod", 1).is_some());
        assert_eq!(ids.guild_id("mod", 2), None);
    }

    #[tokio::test]
    async fn test_wrong_scope_and_duplicates_deleted() {
        let (platform, sync) = setup(
            MemoryPlatform::with_guilds([1]),
            vec![global("a"), guild_only("g", &[])],
            false,
        );
        platform.seed_command(Scope::Global, "a").await;
        platform.seed_command(Scope::Global, "a").await;
        platform.seed_command(Scope::Global, "g").await;
        platform.seed_command(Scope::Guild(1), "a").await;

        let report = sync.sync_all().await;

        assert_eq!(report.deleted, 3);
        assert_eq!(platform.command_names(Scope::Global).await, vec!["a"]);
        assert_eq!(platform.command_names(Scope::Guild(1)).await, vec!["g"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_pass() {
        let (platform, sync) = setup(
            MemoryPlatform::with_guilds([1]),
            vec![global("a"), global("b"), guild_only("g", &[])],
            false,
        );
        platform.fail(Operation::Create, "a").await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sync = sync.with_error_handler(Arc::new(move |err: &RegistrationError| {
            sink.lock().unwrap().push(err.command.clone());
        }));

        let report = sync.sync_all().await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].op, SyncOp::Create);
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(platform.command_names(Scope::Global).await, vec!["b"]);
        assert_eq!(platform.command_names(Scope::Guild(1)).await, vec!["g"]);

        platform.heal().await;
        let retry = sync.sync_all().await;
        assert_eq!(retry.created, 1);
        assert_eq!(platform.command_names(Scope::Global).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_list_skips_scope() {
        let (platform, sync) = setup(
            MemoryPlatform::with_guilds([1]),
            vec![global("a"), guild_only("g", &[])],
            false,
        );
        platform.fail(Operation::List, "global").await;

        let report = sync.sync_all().await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].op, SyncOp::List);
        assert!(platform.command_names(Scope::Global).await.is_empty());
        assert_eq!(platform.command_names(Scope::Guild(1)).await, vec!["g"]);
    }

    #[tokio::test]
    async fn test_failed_guild_listing_reported_separately() {
        let (platform, sync) = setup(
            MemoryPlatform::with_guilds([1]),
            vec![global("a"), guild_only("g", &[])],
            false,
        );
        platform.fail(Operation::JoinedGuilds, ANY_TARGET).await;

        let report = sync.sync_all().await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].op, SyncOp::Guilds);
        assert_eq!(platform.command_names(Scope::Global).await, vec!["a"]);
        assert!(platform.command_names(Scope::Guild(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_only_on_launch() {
        let (platform, sync) = setup(MemoryPlatform::new(), vec![global("a")], true);
        let id = platform.seed_command(Scope::Global, "a").await;

        sync.sync_all().await;
        sync.sync_all().await;

        let updates: Vec<_> = platform
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, PlatformCall::Update { .. }))
            .collect();
        assert_eq!(
            updates,
            vec![PlatformCall::Update {
                scope: Scope::Global,
                id,
                name: "a".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_guild_join_and_leave() {
        let (platform, sync) = setup(MemoryPlatform::new(), vec![guild_only("g", &[])], false);
        sync.sync_all().await;

        platform.join_guild(7).await;
        let report = sync.guild_joined(7).await;
        assert_eq!(report.created, 1);
        assert_eq!(sync.registered_ids().await.guilds(), vec![7]);

        platform.clear_calls().await;
        sync.guild_left(7).await;
        assert_eq!(sync.registered_ids().await.guild_id("g", 7), None);
        assert!(platform.calls().await.is_empty());
    }
}
