// Command Module - Registry of named commands and the sub-command dispatcher
//
// A registry maps a command name to either a leaf handler or a nested
// registry. Dispatch consumes leading tokens until it reaches a leaf and
// hands the remaining tokens to the handler as raw string arguments.

pub mod registry;
pub mod types;


pub use registry::CommandRegistry;
pub use types::{
    CommandArgs, CommandEntry, CommandError, CommandHandler, CommandTarget, Dispatch, HandlerResult,
    Invocation,
};
