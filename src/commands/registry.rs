// Command Registry - Name to handler mapping with recursive sub-command dispatch

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

use super::types::{CommandEntry, CommandError, CommandTarget, Dispatch, HandlerResult, Invocation};
use crate::logging::CommandLogger;

/// Column the description starts at in help listings.
const HELP_COLUMN: usize = 40;

pub struct CommandRegistry<C> {
    name: String,
    description: String,
    entries: HashMap<String, CommandEntry<C>>,
    separator_width: usize,
}

impl<C> CommandRegistry<C> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            entries: HashMap::new(),
            separator_width: 61,
        }
    }

    pub fn with_separator_width(mut self, width: usize) -> Self {
        self.separator_width = width;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Bind `name` to `entry`. An existing entry with the same name is
    /// replaced and returned: the last registration wins.
    pub fn register(&mut self, name: impl Into<String>, entry: CommandEntry<C>) -> Option<CommandEntry<C>> {
        let name = name.into();
        let previous = self.entries.insert(name.clone(), entry);
        if previous.is_some() {
            debug!(registry = %self.name, command = %name, "replaced existing command");
        }
        previous
    }

    /// Register a leaf handler.
    pub fn add_command<F>(&mut self, name: &str, description: &str, args: &[&str], handler: F) -> &mut Self
    where
        F: Fn(&mut Invocation<'_, C>) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(name, CommandEntry::handler(description, args, handler));
        self
    }

    /// Register a nested registry under its own name.
    pub fn add_registry(&mut self, registry: CommandRegistry<C>) -> &mut Self {
        let name = registry.name().to_string();
        self.register(name, CommandEntry::sub_registry(registry));
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry<C>> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CommandEntry<C>> {
        self.entries.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<CommandEntry<C>> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Route `tokens` (the words after this registry's own name) to a handler.
    /// Nothing raised by a handler escapes: failures and panics are logged.
    pub fn dispatch(&self, state: &mut C, logger: &CommandLogger, tokens: &[String]) -> Dispatch {
        let mut path = vec![self.name.clone()];
        self.dispatch_at(state, logger, &mut path, tokens)
    }

    fn dispatch_at(
        &self,
        state: &mut C,
        logger: &CommandLogger,
        path: &mut Vec<String>,
        tokens: &[String],
    ) -> Dispatch {
        let Some((first, rest)) = tokens.split_first() else {
            self.print_help(logger, path);
            return Dispatch::Help;
        };

        let Some(entry) = self.entries.get(first) else {
            let unknown = CommandError::UnknownCommand(format!("{} {}", path.join(" "), first));
            logger.diagnostic(&format!(
                "{}. Type \"{}\" for a list of commands.",
                unknown,
                path.join(" ")
            ));
            return Dispatch::Unknown(first.clone());
        };

        path.push(first.clone());
        match &entry.target {
            CommandTarget::SubRegistry(registry) => registry.dispatch_at(state, logger, path, rest),
            CommandTarget::Handler(handler) => {
                let command = path.join(" ");
                debug!(command = %command, args = ?rest, "invoking command");

                let mut invocation = Invocation {
                    state,
                    registry: self,
                    logger,
                    path: path.as_slice(),
                    args: super::CommandArgs::new(rest.to_vec()),
                };

                let outcome = catch_unwind(AssertUnwindSafe(|| handler(&mut invocation)));
                let message = match outcome {
                    Ok(Ok(())) => return Dispatch::Invoked,
                    Ok(Err(e)) => format!("{:#}", e),
                    Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
                };

                let failure = CommandError::HandlerFailure {
                    command,
                    message: message.clone(),
                };
                error!("{}", failure);
                logger.diagnostic(&failure.to_string());
                if let Some(usage) = self.usage_of(first, path) {
                    logger.diagnostic(&format!("Usage: {}", usage));
                }
                Dispatch::Failed(message)
            }
        }
    }

    fn usage_of(&self, name: &str, path: &[String]) -> Option<String> {
        let entry = self.entries.get(name)?;
        if entry.args.is_empty() {
            return None;
        }
        Some(format!("{} {}", path.join(" "), entry.args.join(" ")))
    }

    /// Help lines for every leaf under this registry, nested ones expanded.
    pub fn help_lines(&self, path: &[String]) -> Vec<String> {
        let mut lines = Vec::new();
        for name in self.names() {
            let Some(entry) = self.entries.get(name) else {
                continue;
            };

            let mut child_path = path.to_vec();
            child_path.push(name.to_string());

            match &entry.target {
                CommandTarget::SubRegistry(registry) => {
                    lines.extend(registry.help_lines(&child_path));
                }
                CommandTarget::Handler(_) => {
                    let mut usage = child_path.join(" ");
                    for arg in &entry.args {
                        usage.push(' ');
                        usage.push_str(arg);
                    }
                    lines.push(format!(
                        "{:<width$} {}",
                        usage,
                        entry.description,
                        width = HELP_COLUMN - 1
                    ));
                }
            }
        }
        lines
    }

    /// Log the help listing for the commands reachable from `path`.
    pub fn print_help(&self, logger: &CommandLogger, path: &[String]) {
        let mut message = format!("{}{} Help:\n", logger.prefix(), path.join(" "));
        if !self.description.is_empty() {
            message.push_str(&self.description);
            message.push('\n');
        }
        message.push('\n');
        for line in self.help_lines(path) {
            message.push_str(&line);
            message.push('\n');
        }
        message.push_str(&"=".repeat(self.separator_width));
        logger.log_message(&message);
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
