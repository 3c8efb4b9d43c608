//! Interaction dispatch and the reply pipeline.
//!
//! Every interaction runs on its own task:
//! `Received → Resolved → PreHooks → RateLimitCheck → Executing → PostHooks → Replied`.
//! Handler and hook failures are contained and answered with the error
//! payload; only a failed platform call ends in [`Outcome::Failed`].

use crate::component::ComponentRouter;
use crate::descriptor::{CommandDescriptor, EphemeralPolicy, ReplyMode};
use crate::error::{DispatchError, LookupError};
use crate::handler::{ButtonHandler, CommandContext, ModalHandler};
use crate::rate_limit::RateLimiter;
use crate::registry::CommandRegistry;
use crate::reply::{
    build_reply, component_reply, cooldown_response, error_reply, inactive_response,
};
use crate::response::CommandResponse;
use anyhow::anyhow;
use futures::FutureExt;
use guild_settings::SettingsStore;
use platform_client::{
    Interaction, InteractionId, InteractionKind, PlatformClient, PlatformError, Reply, SentMessage,
};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, instrument, warn};

/// Callback receiving every contained execution error.
pub type InteractionErrorHandler = Arc<dyn Fn(&Interaction, &anyhow::Error) + Send + Sync>;

/// Stages of the reply pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Resolved,
    PreHooks,
    RateLimitCheck,
    Executing,
    PostHooks,
    Replied,
    Failed,
}

/// How an interaction ended.
#[derive(Debug)]
pub enum Outcome {
    /// A reply (or bare acknowledgment) went out. `contained_error` is set when
    /// it carried the error payload.
    Replied { ephemeral: bool, contained_error: bool },
    /// Nobody owns the interaction; nothing was sent. Terminal state `Failed`.
    Dropped(LookupError),
    /// A platform call needed to answer failed.
    Failed(DispatchError),
}

impl Outcome {
    /// Terminal pipeline state of this outcome.
    pub fn state(&self) -> PipelineState {
        match self {
            Outcome::Replied { .. } => PipelineState::Replied,
            Outcome::Dropped(_) | Outcome::Failed(_) => PipelineState::Failed,
        }
    }

    pub fn is_replied(&self) -> bool {
        matches!(self, Outcome::Replied { .. })
    }
}

enum Target {
    Command,
    Button {
        key: String,
        handler: Arc<dyn ButtonHandler>,
    },
    Modal {
        key: String,
        fields: BTreeMap<String, String>,
        handler: Arc<dyn ModalHandler>,
    },
}

fn transition(state: PipelineState) {
    debug!(?state, "Pipeline transition");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Sends replies for one interaction, tracking whether it was acknowledged.
struct ReplyChannel<'a> {
    platform: &'a dyn PlatformClient,
    interaction: InteractionId,
    ephemeral: bool,
    acknowledged: bool,
    delivered: bool,
}

impl ReplyChannel<'_> {
    async fn acknowledge(&mut self) -> Result<(), PlatformError> {
        if !self.acknowledged {
            self.platform.acknowledge(self.interaction, self.ephemeral).await?;
            self.acknowledged = true;
        }
        Ok(())
    }

    /// First content goes out as the reply, anything after as a follow-up.
    /// `None` only makes sure the interaction is acknowledged.
    async fn send(&mut self, reply: Option<Reply>) -> Result<Option<SentMessage>, PlatformError> {
        let Some(reply) = reply else {
            self.acknowledge().await?;
            return Ok(None);
        };
        let sent = if self.acknowledged {
            self.platform.send_deferred(self.interaction, &reply).await?
        } else {
            let sent = self.platform.reply(self.interaction, &reply).await?;
            self.acknowledged = true;
            sent
        };
        self.delivered = true;
        Ok(Some(sent))
    }
}

/// Routes interactions to their commands and answers them.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    router: ComponentRouter,
    platform: Arc<dyn PlatformClient>,
    settings: Arc<dyn SettingsStore>,
    rate_limiter: Arc<RateLimiter>,
    permits: Option<Arc<Semaphore>>,
    on_error: InteractionErrorHandler,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        platform: Arc<dyn PlatformClient>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            router: ComponentRouter::new(registry.clone()),
            registry,
            platform,
            settings,
            rate_limiter: Arc::new(RateLimiter::new()),
            permits: None,
            on_error: Arc::new(|_: &Interaction, _: &anyhow::Error| {}),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Cap the number of interactions handled at once. `0` means unbounded.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.permits = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Observe contained execution errors, e.g. to report them elsewhere.
    pub fn with_error_handler(mut self, handler: InteractionErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Handle `interaction` on a new task and return immediately.
    pub fn dispatch(&self, interaction: Interaction) -> JoinHandle<Outcome> {
        tokio::spawn(self.clone().run(interaction))
    }

    /// Dispatch every interaction of `events`. Returns once the stream ends
    /// and every in-flight interaction has been answered.
    pub async fn serve<S>(&self, events: S) -> usize
    where
        S: Stream<Item = Interaction>,
    {
        let mut events = Box::pin(events);
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        loop {
            tokio::select! {
                next = events.next() => match next {
                    Some(interaction) => {
                        tasks.spawn(self.clone().run(interaction));
                        dispatched += 1;
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Interaction task failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Interaction task failed: {}", e);
            }
        }
        debug!(dispatched, "Interaction stream ended");
        dispatched
    }

    async fn run(self, interaction: Interaction) -> Outcome {
        let _permit = match &self.permits {
            Some(permits) => permits.clone().acquire_owned().await.ok(),
            None => None,
        };
        self.handle(interaction).await
    }

    /// Run the whole pipeline for one interaction on the current task.
    #[instrument(skip_all, fields(interaction = interaction.id, user = interaction.user_id))]
    pub async fn handle(&self, interaction: Interaction) -> Outcome {
        transition(PipelineState::Received);

        let (command, target) = match self.resolve(&interaction) {
            Ok(resolved) => resolved,
            Err(e) => {
                transition(PipelineState::Failed);
                warn!("Dropping interaction: {}", e);
                return Outcome::Dropped(e);
            }
        };
        transition(PipelineState::Resolved);

        let ephemeral = self.resolve_ephemeral(&command, &interaction).await;
        let mut channel = ReplyChannel {
            platform: self.platform.as_ref(),
            interaction: interaction.id,
            ephemeral,
            acknowledged: false,
            delivered: false,
        };

        match self.respond(&command, &interaction, target, &mut channel).await {
            Ok(contained_error) => {
                transition(PipelineState::Replied);
                Outcome::Replied {
                    ephemeral,
                    contained_error,
                }
            }
            Err(e) => {
                transition(PipelineState::Failed);
                error!(command = command.name(), "Failed to answer interaction: {}", e);
                Outcome::Failed(e.into())
            }
        }
    }

    /// Forced commands, then inactive ones, are always ephemeral. Otherwise
    /// the guild's default applies; direct messages are public.
    pub async fn resolve_ephemeral(&self, command: &CommandDescriptor, interaction: &Interaction) -> bool {
        if command.ephemeral_policy() == EphemeralPolicy::Forced || !command.is_active() {
            return true;
        }
        match interaction.guild_id {
            Some(guild) => self.settings.guild_ephemeral_default(guild).await,
            None => false,
        }
    }

    fn resolve(&self, interaction: &Interaction) -> Result<(Arc<CommandDescriptor>, Target), LookupError> {
        match &interaction.kind {
            InteractionKind::Command { name, kind } => {
                let command = self.registry.resolve(name)?;
                if command.kind() != *kind {
                    return Err(LookupError::KindMismatch {
                        name: name.clone(),
                        expected: command.kind(),
                        actual: *kind,
                    });
                }
                Ok((command, Target::Command))
            }
            InteractionKind::Button { custom_id } => {
                let (command, key, handler) = self.router.button_handler(custom_id)?;
                Ok((
                    command,
                    Target::Button {
                        key: key.local,
                        handler,
                    },
                ))
            }
            InteractionKind::Modal { custom_id, fields } => {
                let (command, key, handler) = self.router.modal_handler(custom_id)?;
                Ok((
                    command,
                    Target::Modal {
                        key: key.local,
                        fields: fields.clone(),
                        handler,
                    },
                ))
            }
        }
    }

    /// Execute and send. `Ok(true)` when the error payload was sent instead.
    async fn respond(
        &self,
        command: &Arc<CommandDescriptor>,
        interaction: &Interaction,
        target: Target,
        channel: &mut ReplyChannel<'_>,
    ) -> Result<bool, PlatformError> {
        if command.reply_mode() == ReplyMode::Deferred {
            channel.acknowledge().await?;
        }

        let deferred_command =
            command.reply_mode() == ReplyMode::Deferred && matches!(target, Target::Command);
        let assemble = match target {
            Target::Command => build_reply,
            Target::Button { .. } | Target::Modal { .. } => component_reply,
        };
        let executed = AssertUnwindSafe(self.execute(command, interaction, target, channel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(anyhow!("handler panicked: {}", panic_message(&*panic))));

        let ephemeral = channel.ephemeral;
        let delivered = channel.delivered;
        let assembled = executed
            .and_then(|response| assemble(command, &response, ephemeral))
            .and_then(|reply| match reply {
                None if deferred_command && !delivered => Err(anyhow!(
                    "deferred command '{}' produced no content",
                    command.name()
                )),
                reply => Ok(reply),
            });
        let (reply, contained) = match assembled {
            Ok(reply) => (reply, false),
            Err(e) => (Some(self.contain(command, interaction, e, ephemeral)), true),
        };

        let sent = channel.send(reply).await?;
        if let (Some(message), Some(secs)) = (sent, command.message_expiry()) {
            self.expire_later(message, secs);
        }
        Ok(contained)
    }

    async fn execute(
        &self,
        command: &CommandDescriptor,
        interaction: &Interaction,
        target: Target,
        channel: &mut ReplyChannel<'_>,
    ) -> anyhow::Result<CommandResponse> {
        let ctx = CommandContext {
            user_id: interaction.user_id,
            interaction,
            registry: &self.registry,
            settings: self.settings.as_ref(),
            platform: self.platform.as_ref(),
        };

        transition(PipelineState::PreHooks);
        if let Some(intermediate) = command.hooks().run_pre(command, interaction).await? {
            let reply = match target {
                Target::Command => build_reply(command, &intermediate, channel.ephemeral)?,
                _ => component_reply(command, &intermediate, channel.ephemeral)?,
            };
            channel.send(reply).await?;
        }

        let response = if !command.is_active() {
            inactive_response(command)
        } else {
            match target {
                Target::Command => self.run_command(command, &ctx).await?,
                Target::Button { key, handler } => {
                    transition(PipelineState::Executing);
                    handler
                        .on_button(&key, &ctx)
                        .await?
                        .unwrap_or_else(CommandResponse::empty)
                }
                Target::Modal {
                    key,
                    fields,
                    handler,
                } => {
                    transition(PipelineState::Executing);
                    handler
                        .on_modal(&key, &fields, &ctx)
                        .await?
                        .unwrap_or_else(CommandResponse::empty)
                }
            }
        };

        transition(PipelineState::PostHooks);
        command.hooks().run_post(command, interaction, response).await
    }

    async fn run_command(
        &self,
        command: &CommandDescriptor,
        ctx: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResponse> {
        let (name, user) = (command.name(), ctx.user_id);

        transition(PipelineState::RateLimitCheck);
        if command.rate_limit().is_some() {
            if let Some(expiry) = self.rate_limiter.expiry(name, user) {
                debug!(command = name, user, expiry, "Caller is rate limited");
                return Ok(cooldown_response(command, expiry, self.rate_limiter.now()));
            }
        }

        transition(PipelineState::Executing);
        let response = command.handler().execute(ctx).await?;

        if response.forgive {
            self.rate_limiter.clear(name, user);
        } else if let Some(window) = command.rate_limit() {
            self.rate_limiter.arm(name, user, window);
        }
        Ok(response)
    }

    fn contain(
        &self,
        command: &CommandDescriptor,
        interaction: &Interaction,
        error: anyhow::Error,
        ephemeral: bool,
    ) -> Reply {
        error!(command = command.name(), "Command execution failed: {:#}", error);
        if command.forgives_on_error() {
            self.rate_limiter.clear(command.name(), interaction.user_id);
        }
        (self.on_error)(interaction, &error);
        error_reply(&error, ephemeral)
    }

    fn expire_later(&self, message: SentMessage, secs: u64) {
        let platform = self.platform.clone();
        debug!(message = message.id, secs, "Scheduling message expiry");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            if let Err(e) = platform.delete_message(message).await {
                warn!(message = message.id, "Failed to delete expired message: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::reply::{ERROR_TITLE, INACTIVE_MESSAGE};
    use async_trait::async_trait;
    use guild_settings::{JsonSettingsStore, SettingsConfig};
    use mockall::mock;
    use mockall::predicate::eq;
    use platform_client::{
        ButtonStyle, CommandKind, GuildId, MemoryPlatform, MessageContent, Operation, PlatformCall,
    };

    mock! {
        pub Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn guild_ephemeral_default(&self, guild: GuildId) -> bool;
            async fn set_guild_ephemeral_default(&self, guild: GuildId, ephemeral: bool);
            async fn remove_guild(&self, guild: GuildId);
            async fn retain_guilds(&self, joined: &[GuildId]) -> usize;
            async fn schedule_flush(&self);
        }
    }

    fn hello() -> crate::descriptor::CommandBuilder {
        CommandDescriptor::builder("hello", handler_fn(|_| Ok(CommandResponse::text("hi"))))
            .description("Say hello")
            .text_output()
    }

    fn dispatcher_with(
        commands: Vec<CommandDescriptor>,
        settings: Arc<dyn SettingsStore>,
    ) -> (Arc<MemoryPlatform>, Dispatcher) {
        let platform = Arc::new(MemoryPlatform::new());
        let mut registry = CommandRegistry::new();
        registry.register(commands);
        let dispatcher = Dispatcher::new(Arc::new(registry), platform.clone(), settings);
        (platform, dispatcher)
    }

    fn dispatcher(commands: Vec<CommandDescriptor>) -> (Arc<MemoryPlatform>, Dispatcher) {
        dispatcher_with(
            commands,
            Arc::new(JsonSettingsStore::new(SettingsConfig::default())),
        )
    }

    fn text_of(reply: &Reply) -> &str {
        match &reply.content {
            MessageContent::Text(text) => text,
            MessageContent::Embeds(_) => panic!("expected text, got embeds"),
        }
    }

    fn error_title(reply: &Reply) -> Option<&str> {
        match &reply.content {
            MessageContent::Embeds(embeds) => embeds.first().and_then(|e| e.title.as_deref()),
            MessageContent::Text(_) => None,
        }
    }

    #[tokio::test]
    async fn test_immediate_reply() {
        let (platform, dispatcher) = dispatcher(vec![hello().build().unwrap()]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "hello")).await;

        assert!(matches!(
            outcome,
            Outcome::Replied {
                ephemeral: false,
                contained_error: false
            }
        ));
        let calls = platform.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(text_of(calls[0].reply().unwrap()), "hi");
    }

    #[tokio::test]
    async fn test_deferred_acknowledges_first() {
        let (platform, dispatcher) = dispatcher(vec![hello().deferred().build().unwrap()]);

        dispatcher.handle(Interaction::command(1, 10, "hello")).await;

        let calls = platform.calls().await;
        assert_eq!(
            calls[0],
            PlatformCall::Acknowledge {
                interaction: 1,
                ephemeral: false
            }
        );
        assert!(matches!(calls[1], PlatformCall::SendDeferred { .. }));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_forced_ephemeral_skips_settings() {
        let mut settings = MockSettings::new();
        settings.expect_guild_ephemeral_default().never();
        let (platform, dispatcher) =
            dispatcher_with(vec![hello().force_ephemeral().build().unwrap()], Arc::new(settings));

        let outcome = dispatcher.handle(Interaction::command(1, 10, "hello").in_guild(5)).await;

        assert!(matches!(outcome, Outcome::Replied { ephemeral: true, .. }));
        assert!(platform.replies_for(1).await[0].ephemeral);
    }

    #[tokio::test]
    async fn test_guild_default_consulted() {
        let mut settings = MockSettings::new();
        settings
            .expect_guild_ephemeral_default()
            .with(eq(5))
            .times(1)
            .return_const(true);
        let (_platform, dispatcher) =
            dispatcher_with(vec![hello().build().unwrap()], Arc::new(settings));

        let outcome = dispatcher.handle(Interaction::command(1, 10, "hello").in_guild(5)).await;
        assert!(matches!(outcome, Outcome::Replied { ephemeral: true, .. }));
    }

    #[tokio::test]
    async fn test_direct_message_is_public() {
        let mut settings = MockSettings::new();
        settings.expect_guild_ephemeral_default().never();
        let (_platform, dispatcher) =
            dispatcher_with(vec![hello().build().unwrap()], Arc::new(settings));

        let outcome = dispatcher.handle(Interaction::command(1, 10, "hello")).await;
        assert!(matches!(outcome, Outcome::Replied { ephemeral: false, .. }));
    }

    #[tokio::test]
    async fn test_inactive_command() {
        let (platform, dispatcher) = dispatcher(vec![hello().active(false).build().unwrap()]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "hello")).await;

        assert!(matches!(outcome, Outcome::Replied { ephemeral: true, .. }));
        let reply = &platform.replies_for(1).await[0];
        assert_eq!(text_of(reply), INACTIVE_MESSAGE);
        assert!(reply.ephemeral);
    }

    #[tokio::test]
    async fn test_unknown_command_dropped() {
        let (platform, dispatcher) = dispatcher(vec![hello().build().unwrap()]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "nope")).await;

        assert!(matches!(
            outcome,
            Outcome::Dropped(LookupError::UnknownCommand(ref name)) if name == "nope"
        ));
        assert!(platform.calls().await.is_empty());
        assert_eq!(outcome.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_deferred_without_content_sends_error() {
        let quiet = CommandDescriptor::builder("quiet", handler_fn(|_| Ok(CommandResponse::empty())))
            .description("Say nothing")
            .deferred()
            .build()
            .unwrap();
        let (platform, dispatcher) = dispatcher(vec![quiet]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "quiet")).await;

        assert!(matches!(
            outcome,
            Outcome::Replied {
                contained_error: true,
                ..
            }
        ));
        let calls = platform.calls().await;
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], PlatformCall::Acknowledge { .. }));
        assert!(matches!(calls[1], PlatformCall::SendDeferred { .. }));
        assert_eq!(error_title(calls[1].reply().unwrap()), Some(ERROR_TITLE));
    }

    #[tokio::test]
    async fn test_immediate_without_content_acknowledges() {
        let quiet = CommandDescriptor::builder("quiet", handler_fn(|_| Ok(CommandResponse::empty())))
            .description("Say nothing")
            .build()
            .unwrap();
        let (platform, dispatcher) = dispatcher(vec![quiet]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "quiet")).await;

        assert!(matches!(
            outcome,
            Outcome::Replied {
                contained_error: false,
                ..
            }
        ));
        assert_eq!(
            platform.calls().await,
            vec![PlatformCall::Acknowledge {
                interaction: 1,
                ephemeral: false
            }]
        );
    }

    #[tokio::test]
    async fn test_kind_mismatch_dropped() {
        let (platform, dispatcher) = dispatcher(vec![hello().build().unwrap()]);
        let mut interaction = Interaction::command(1, 10, "hello");
        interaction.kind = InteractionKind::Command {
            name: "hello".into(),
            kind: CommandKind::User,
        };

        let outcome = dispatcher.handle(interaction).await;

        assert!(matches!(outcome, Outcome::Dropped(LookupError::KindMismatch { .. })));
        assert!(platform.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_contained() {
        let failing = CommandDescriptor::builder(
            "boom",
            handler_fn(|_| Err(anyhow!("disk full").context("saving profile"))),
        )
        .description("Always fails")
        .build()
        .unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (platform, dispatcher) = dispatcher(vec![failing]);
        let dispatcher = dispatcher.with_error_handler(Arc::new(
            move |interaction: &Interaction, error: &anyhow::Error| {
                sink.lock().unwrap().push((interaction.id, error.to_string()));
            },
        ));

        let outcome = dispatcher.handle(Interaction::command(1, 10, "boom")).await;

        assert!(matches!(outcome, Outcome::Replied { contained_error: true, .. }));
        assert_eq!(error_title(&platform.replies_for(1).await[0]), Some(ERROR_TITLE));
        assert_eq!(*seen.lock().unwrap(), vec![(1, "saving profile".to_string())]);
    }

    #[tokio::test]
    async fn test_panic_contained() {
        let panicking = CommandDescriptor::builder(
            "panic",
            handler_fn(|_| -> anyhow::Result<CommandResponse> { panic!("handler blew up") }),
        )
        .description("Panics")
        .build()
        .unwrap();
        let (platform, dispatcher) = dispatcher(vec![panicking]);

        let outcome = dispatcher.dispatch(Interaction::command(1, 10, "panic")).await.unwrap();

        assert!(matches!(outcome, Outcome::Replied { contained_error: true, .. }));
        let reply = &platform.replies_for(1).await[0];
        match &reply.content {
            MessageContent::Embeds(embeds) => {
                assert!(embeds[0].fields[0].value.contains("handler blew up"))
            }
            MessageContent::Text(_) => panic!("expected the error payload"),
        }
    }

    #[tokio::test]
    async fn test_output_kind_mismatch_contained() {
        let wrong = CommandDescriptor::builder("wrong", handler_fn(|_| Ok(CommandResponse::text("hi"))))
            .description("Embed-only command returning text")
            .build()
            .unwrap();
        let (platform, dispatcher) = dispatcher(vec![wrong]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "wrong")).await;

        assert!(matches!(outcome, Outcome::Replied { contained_error: true, .. }));
        assert_eq!(error_title(&platform.replies_for(1).await[0]), Some(ERROR_TITLE));
    }

    #[tokio::test]
    async fn test_rate_limit_cooldown() {
        let (platform, dispatcher) = dispatcher(vec![hello().rate_limit(30).build().unwrap()]);
        let now = dispatcher.rate_limiter().now();

        dispatcher.handle(Interaction::command(1, 10, "hello")).await;
        dispatcher.handle(Interaction::command(2, 10, "hello")).await;
        dispatcher.handle(Interaction::command(3, 11, "hello")).await;

        assert_eq!(text_of(&platform.replies_for(1).await[0]), "hi");
        let cooldown = text_of(&platform.replies_for(2).await[0]).to_string();
        assert!(cooldown.starts_with("You are still rate limited"));
        let expiry = dispatcher.rate_limiter().expiry("hello", 10).unwrap();
        assert!(expiry >= now + 30);
        assert!(cooldown.contains(&format!("<t:{}:R>", expiry)));
        assert_eq!(text_of(&platform.replies_for(3).await[0]), "hi");
    }

    #[tokio::test]
    async fn test_forgive_clears_entry() {
        let forgiving = CommandDescriptor::builder(
            "maybe",
            handler_fn(|_| Ok(CommandResponse::text("not counted").forgive())),
        )
        .description("Forgives itself")
        .text_output()
        .rate_limit(60)
        .build()
        .unwrap();
        let (_platform, dispatcher) = dispatcher(vec![forgiving]);

        dispatcher.handle(Interaction::command(1, 10, "maybe")).await;

        assert!(!dispatcher.rate_limiter().is_limited("maybe", 10));
    }

    #[tokio::test]
    async fn test_forgive_on_error() {
        let flaky = CommandDescriptor::builder(
            "flaky",
            handler_fn(|_| Ok(CommandResponse::text("hi"))),
        )
        .description("Embed-only, so text is an error")
        .rate_limit(60)
        .forgive_on_error()
        .build()
        .unwrap();
        let (_platform, dispatcher) = dispatcher(vec![flaky]);

        let outcome = dispatcher.handle(Interaction::command(1, 10, "flaky")).await;

        assert!(matches!(outcome, Outcome::Replied { contained_error: true, .. }));
        assert!(!dispatcher.rate_limiter().is_limited("flaky", 10));
    }

    struct Goodbye;

    #[async_trait]
    impl ButtonHandler for Goodbye {
        async fn on_button(
            &self,
            key: &str,
            _ctx: &CommandContext<'_>,
        ) -> anyhow::Result<Option<CommandResponse>> {
            Ok((key == "goodbye").then(|| CommandResponse::text("bye")))
        }
    }

    #[tokio::test]
    async fn test_button_routed_to_owner() {
        let command = hello()
            .button("goodbye", ButtonStyle::Danger, "Goodbye")
            .on_button(Goodbye)
            .build()
            .unwrap();
        let (platform, dispatcher) = dispatcher(vec![command]);

        dispatcher.handle(Interaction::button(1, 10, "hello_goodbye")).await;
        dispatcher.handle(Interaction::button(2, 10, "hello_other")).await;

        assert_eq!(text_of(&platform.replies_for(1).await[0]), "bye");
        assert!(platform.replies_for(2).await.is_empty());
        assert!(platform.calls().await.contains(&PlatformCall::Acknowledge {
            interaction: 2,
            ephemeral: false
        }));
    }

    #[tokio::test]
    async fn test_button_without_capability_dropped() {
        let (_platform, dispatcher) = dispatcher(vec![hello().build().unwrap()]);

        let outcome = dispatcher.handle(Interaction::button(1, 10, "hello_goodbye")).await;

        assert!(matches!(
            outcome,
            Outcome::Dropped(LookupError::MissingCapability { .. })
        ));
    }

    #[tokio::test]
    async fn test_reply_failure_reported() {
        let (platform, dispatcher) = dispatcher(vec![hello().build().unwrap()]);
        platform.fail(Operation::Reply, "1").await;

        let outcome = dispatcher.handle(Interaction::command(1, 10, "hello")).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(DispatchError::Platform(PlatformError::Api { .. }))
        ));
        assert_eq!(outcome.state(), PipelineState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_expiry_deletes_reply() {
        let (platform, dispatcher) = dispatcher(vec![hello().message_expiry(30).build().unwrap()]);

        dispatcher.handle(Interaction::command(1, 10, "hello")).await;
        assert!(!platform
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, PlatformCall::DeleteMessage(_))));

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(platform
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, PlatformCall::DeleteMessage(_))));
    }

    #[tokio::test]
    async fn test_serve_drains_stream() {
        let (platform, dispatcher) = dispatcher(vec![hello().build().unwrap()]);
        let dispatcher = dispatcher.with_max_concurrency(2);
        let events = tokio_stream::iter((1..=5).map(|id| Interaction::command(id, 10, "hello")));

        let dispatched = dispatcher.serve(events).await;

        assert_eq!(dispatched, 5);
        for id in 1..=5 {
            assert_eq!(platform.replies_for(id).await.len(), 1);
        }
    }
}
