// Command types - Entries, handlers, arguments and dispatch outcomes

use std::sync::Arc;

use super::registry::CommandRegistry;
use crate::logging::CommandLogger;

pub type HandlerResult = anyhow::Result<()>;

/// Leaf handler bound to a command name.
pub type CommandHandler<C> = Arc<dyn Fn(&mut Invocation<'_, C>) -> HandlerResult + Send + Sync>;

/// What a command name resolves to.
pub enum CommandTarget<C> {
    Handler(CommandHandler<C>),
    SubRegistry(CommandRegistry<C>),
}

/// A registered command: its target plus documentation.
pub struct CommandEntry<C> {
    pub target: CommandTarget<C>,
    /// Argument hints shown in help. Never validated at dispatch time.
    pub args: Vec<String>,
    pub description: String,
}

impl<C> CommandEntry<C> {
    pub fn handler<F>(description: impl Into<String>, args: &[&str], handler: F) -> Self
    where
        F: Fn(&mut Invocation<'_, C>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            target: CommandTarget::Handler(Arc::new(handler)),
            args: args.iter().map(|a| a.to_string()).collect(),
            description: description.into(),
        }
    }

    pub fn from_handler(description: impl Into<String>, args: &[&str], handler: CommandHandler<C>) -> Self {
        Self {
            target: CommandTarget::Handler(handler),
            args: args.iter().map(|a| a.to_string()).collect(),
            description: description.into(),
        }
    }

    pub fn sub_registry(registry: CommandRegistry<C>) -> Self {
        let description = registry.description().to_string();
        Self {
            target: CommandTarget::SubRegistry(registry),
            args: Vec::new(),
            description,
        }
    }

    pub fn as_handler(&self) -> Option<&CommandHandler<C>> {
        match &self.target {
            CommandTarget::Handler(handler) => Some(handler),
            CommandTarget::SubRegistry(_) => None,
        }
    }

    pub fn as_registry(&self) -> Option<&CommandRegistry<C>> {
        match &self.target {
            CommandTarget::Handler(_) => None,
            CommandTarget::SubRegistry(registry) => Some(registry),
        }
    }

    pub fn as_registry_mut(&mut self) -> Option<&mut CommandRegistry<C>> {
        match &mut self.target {
            CommandTarget::Handler(_) => None,
            CommandTarget::SubRegistry(registry) => Some(registry),
        }
    }
}

/// Positional string arguments handed to a leaf handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    args: Vec<String>,
}

impl CommandArgs {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.args.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    /// Argument at `index`, or `MissingArgument` naming `hint`.
    pub fn require(&self, index: usize, hint: &str) -> Result<&str, CommandError> {
        self.get(index).ok_or_else(|| CommandError::MissingArgument {
            hint: hint.to_string(),
        })
    }

    /// Arguments from `index` onward joined by single spaces.
    pub fn rest(&self, index: usize) -> String {
        self.args.get(index..).map(|rest| rest.join(" ")).unwrap_or_default()
    }
}

/// Everything a leaf handler can reach while it runs.
pub struct Invocation<'a, C> {
    pub state: &'a mut C,
    /// Registry that owns the invoked entry.
    pub registry: &'a CommandRegistry<C>,
    pub logger: &'a CommandLogger,
    /// Tokens consumed to reach the handler, starting with the root command.
    pub path: &'a [String],
    pub args: CommandArgs,
}

impl<C> Invocation<'_, C> {
    /// The invoked command as typed, e.g. `sp dump`.
    pub fn command_line(&self) -> String {
        self.path.join(" ")
    }
}

/// Result of dispatching one token sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// No tokens remained; help was printed.
    Help,
    Invoked,
    Unknown(String),
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("Missing argument {hint}")]
    MissingArgument { hint: String },

    #[error("Invalid argument \"{value}\": {reason}")]
    InvalidArgument { value: String, reason: String },

    #[error("Error while executing \"{command}\": {message}")]
    HandlerFailure { command: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_accessors() {
        let args = CommandArgs::new(vec!["2.5".into(), "sp".into(), "list".into()]);
        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some("2.5"));
        assert_eq!(args.get(3), None);
        assert_eq!(args.rest(1), "sp list");
        assert_eq!(args.rest(5), "");
        assert_eq!(args.iter().count(), 3);
    }

    #[test]
    fn test_dispatch_error_messages() {
        let unknown = CommandError::UnknownCommand("sp lst".to_string());
        assert_eq!(unknown.to_string(), "Unknown command \"sp lst\"");

        let failure = CommandError::HandlerFailure {
            command: "sp dump".to_string(),
            message: "Missing argument <filename>".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "Error while executing \"sp dump\": Missing argument <filename>"
        );
    }

    #[test]
    fn test_require_names_missing_hint() {
        let args = CommandArgs::new(vec!["plugins".into()]);
        assert_eq!(args.require(0, "<dump_type>").unwrap(), "plugins");

        let err = args.require(1, "<filename>").unwrap_err();
        assert_eq!(err.to_string(), "Missing argument <filename>");
    }
}
