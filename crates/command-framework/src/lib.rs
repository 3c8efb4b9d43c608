//! Command registration and interaction dispatch for chat-platform bots.
//!
//! Commands are declared as [`CommandDescriptor`]s and collected in a
//! [`CommandRegistry`]. The [`RegistrationSynchronizer`] keeps the platform's
//! remote registrations in step with it, and the [`Dispatcher`] answers
//! incoming interactions through the reply pipeline: hooks, rate limiting,
//! handler execution, output checks and error containment.

pub mod builtin;
pub mod component;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod framework;
pub mod handler;
pub mod hooks;
pub mod logging;
pub mod rate_limit;
pub mod registry;
pub mod reply;
pub mod response;
pub mod sync;

pub use component::{ComponentKey, ComponentRouter};
pub use config::{AboutConfig, BotConfig, DispatchConfig, FrameworkConfig};
pub use descriptor::{
    ButtonSpec, CommandBuilder, CommandDescriptor, EphemeralPolicy, OutputKind, ReplyMode,
    Visibility,
};
pub use dispatch::{Dispatcher, InteractionErrorHandler, Outcome, PipelineState};
pub use error::{
    Capability, ConfigError, DispatchError, LookupError, RegistrationError, SyncOp,
};
pub use framework::Framework;
pub use handler::{handler_fn, ButtonHandler, CommandContext, CommandHandler, ModalHandler};
pub use hooks::{CommandHook, HookChain, HookStage};
pub use logging::init_logging;
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use registry::{CommandRegistry, RegisterReport};
pub use response::CommandResponse;
pub use sync::{RegisteredIds, RegistrationErrorHandler, RegistrationSynchronizer, SyncReport};
