// sp-console - Console command dispatch, plugin lifecycle and delayed execution

pub mod auth;
pub mod commands;
pub mod config;
pub mod core_command;
pub mod credits;
pub mod docs;
pub mod dumps;
pub mod host;
pub mod logging;
pub mod plugins;
pub mod scheduler;

pub use commands::{CommandArgs, CommandEntry, CommandError, CommandRegistry, Dispatch, Invocation};
pub use config::{ConfigError, CoreConfig};
pub use core_command::{CoreCollaborators, CoreCommand, CoreState};
pub use logging::{CommandLogger, LogSink, MemorySink, StdoutSink, TracingSink};
pub use plugins::{DirectoryLoader, FactoryLoader, PluginError, PluginManager, PluginUnit};
pub use scheduler::{DelayHandle, DelayScheduler};
