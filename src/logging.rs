// Logging - Output sink collaborator and the logger handle passed to commands
// All human-readable output of the core funnels through a LogSink.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Destination for every line of text produced by commands.
pub trait LogSink: Send + Sync {
    fn log_message(&self, text: &str);
}

/// Writes messages to stdout, the way a host console echoes them.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log_message(&self, text: &str) {
        println!("{}", text);
    }
}

/// Forwards messages to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log_message(&self, text: &str) {
        tracing::info!(target: "sp.output", "{}", text);
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages logged so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Messages logged so far joined into one string.
    pub fn contents(&self) -> String {
        self.lines.lock().join("\n")
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn log_message(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

/// Logger handle: a sink, the message prefix and a tracing target name.
#[derive(Clone)]
pub struct CommandLogger {
    sink: Arc<dyn LogSink>,
    prefix: String,
    target: String,
}

impl CommandLogger {
    pub fn new(sink: Arc<dyn LogSink>, prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            sink,
            prefix: prefix.into(),
            target: target.into(),
        }
    }

    /// Handle sharing this logger's sink and prefix under a nested target.
    pub fn child(&self, name: &str) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            prefix: self.prefix.clone(),
            target: format!("{}.{}", self.target, name),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn sink(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.sink)
    }

    /// Log text as-is.
    pub fn log_message(&self, text: &str) {
        tracing::trace!(logger = %self.target, "{}", text);
        self.sink.log_message(text);
    }

    /// Log a single diagnostic line with the prefix prepended.
    pub fn diagnostic(&self, text: &str) {
        self.log_message(&format!("{}{}", self.prefix, text));
    }
}

impl std::fmt::Debug for CommandLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLogger")
            .field("prefix", &self.prefix)
            .field("target", &self.target)
            .finish()
    }
}

/// Install the stderr tracing subscriber.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
