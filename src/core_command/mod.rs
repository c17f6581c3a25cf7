// Core Command - The `sp` console command composed from registry, managers and scheduler
//
// `CoreCommand` owns the root registry and the mutable `CoreState` every
// built-in operates on. The host feeds it console lines and calls `tick`
// once per simulation tick.

mod builtins;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use tracing::debug;

use crate::commands::{CommandRegistry, Dispatch, HandlerResult, Invocation};
use crate::config::CoreConfig;
use crate::credits::CreditsStore;
use crate::docs::DocGenerator;
use crate::dumps::{core_dumps, DumpRegistry};
use crate::host::{tokenize, HostClock, HostConsole};
use crate::logging::{CommandLogger, LogSink};
use crate::plugins::{PluginLoader, PluginManager, PluginManagerConfig};
use crate::scheduler::{run_due, DelayScheduler};

pub(crate) use builtins::register_lifecycle;

/// Everything the built-in commands read or mutate.
pub struct CoreState {
    pub config: CoreConfig,
    pub plugins: PluginManager,
    pub auth: PluginManager,
    pub delays: DelayScheduler<CoreState>,
    pub console: Box<dyn HostConsole>,
    pub dumps: Arc<DumpRegistry<CoreState>>,
    pub credits: Box<dyn CreditsStore>,
    pub docs: Box<dyn DocGenerator>,
    pub logger: CommandLogger,
}

/// Host-provided collaborators injected at construction.
pub struct CoreCollaborators {
    pub sink: Arc<dyn LogSink>,
    pub clock: Arc<dyn HostClock>,
    pub console: Box<dyn HostConsole>,
    pub plugin_loader: Box<dyn PluginLoader>,
    pub auth_loader: Box<dyn PluginLoader>,
    pub credits: Box<dyn CreditsStore>,
    pub docs: Box<dyn DocGenerator>,
}

pub struct CoreCommand {
    registry: CommandRegistry<CoreState>,
    state: CoreState,
}

impl CoreCommand {
    pub fn new(config: CoreConfig, collaborators: CoreCollaborators) -> Self {
        let logger = CommandLogger::new(collaborators.sink, config.prefix.clone(), config.command.clone());

        let plugins = PluginManager::new(PluginManagerConfig::new(
            logger.child("plugins"),
            collaborators.plugin_loader,
        ));
        let auth = PluginManager::new(
            PluginManagerConfig::new(logger.child("auth"), collaborators.auth_loader)
                .with_noun("auth backend"),
        );

        let state = CoreState {
            dumps: Arc::new(core_dumps(config.paths.dump_dir.clone())),
            delays: DelayScheduler::new(collaborators.clock),
            console: collaborators.console,
            credits: collaborators.credits,
            docs: collaborators.docs,
            plugins,
            auth,
            logger,
            config,
        };

        let registry = builtins::core_registry(&state.config);
        debug!(command = %state.config.command, commands = registry.len(), "core command ready");

        Self { registry, state }
    }

    pub fn name(&self) -> &str {
        self.registry.name()
    }

    pub fn state(&self) -> &CoreState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }

    pub fn registry(&self) -> &CommandRegistry<CoreState> {
        &self.registry
    }

    /// Add or replace a sub-command of the root command.
    pub fn add_command<F>(&mut self, name: &str, description: &str, args: &[&str], handler: F) -> &mut Self
    where
        F: Fn(&mut Invocation<'_, CoreState>) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry.add_command(name, description, args, handler);
        self
    }

    /// Add or replace a dump producer.
    pub fn register_dump<F>(&mut self, kind: &str, producer: F) -> &mut Self
    where
        F: Fn(&CoreState) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.state.dumps).register(kind, producer);
        self
    }

    /// Run a raw console line. Lines addressed to another command are left
    /// alone and yield `None`.
    pub fn execute_line(&mut self, line: &str) -> Option<Dispatch> {
        let tokens = tokenize(line);
        let (first, rest) = tokens.split_first()?;
        if *first != self.state.config.command {
            return None;
        }
        Some(self.dispatch(rest))
    }

    /// Dispatch the tokens following the command name.
    pub fn dispatch(&mut self, tokens: &[String]) -> Dispatch {
        let logger = self.state.logger.clone();
        self.registry.dispatch(&mut self.state, &logger, tokens)
    }

    /// Fire due delays. Returns how many fired.
    pub fn tick(&mut self) -> usize {
        let logger = self.state.logger.clone();
        run_due(&mut self.state, delays_of, &logger)
    }

    /// Unload every auth backend and plugin.
    pub fn shutdown(&mut self) {
        self.state.plugins.unload_all();
        self.state.auth.unload_all();
    }
}

fn delays_of(state: &mut CoreState) -> &mut DelayScheduler<CoreState> {
    &mut state.delays
}
