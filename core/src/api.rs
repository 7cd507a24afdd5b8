//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `gpgdrive_core::api` instead of reaching into internal modules.

pub use crate::automaton::{
    Automaton, AutomatonOptions, AutomatonState, DeleteSubkeyScript, EditScript,
    InteractionFlags, InteractionReport, OwnerTrustScript, RevokeSubkeyScript, StatusEvent,
};
pub use crate::channel::{
    ChannelContext, ChannelSource, ConfigChannelSource, ContextManager, KeyDatabaseInfo,
    StaticChannelSource,
};
pub use crate::config::{
    load_default, load_from_path, AppConfig, DispatchConfig, EngineConfig, KeyDatabaseConfig,
    LoggingConfig, RuntimeValues, TaskConfig,
};
pub use crate::context::{AppContext, Services, ServicesFactory};
pub use crate::dispatch::{
    ChannelResult, DispatchHandle, DispatchOutcome, GpgconfCommand, MultiChannelDispatcher,
};
pub use crate::error::{CliError, KeyEditError, RunnerError, TaskError};
pub use crate::keys::{KeyHandle, KeyManager, OwnerTrust, Subkey};
pub use crate::runner::{
    CommandExecutor, CommandOutput, CommandSpec, InteractiveSession, SessionLauncher, Signal,
};
pub use crate::task::{Task, TaskData, TaskEvent, TaskOwner, TaskScheduler};
pub use crate::util::beautify_fingerprint;
