// Dump Dispatcher - Named producers that write core state to the logs directory
//
// Producers are keyed by an identifier of the form `dump_<kind>`; the valid
// kinds shown to the user are those identifiers with the prefix stripped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::core_command::CoreState;
use crate::logging::CommandLogger;

/// Prefix of every producer identifier.
pub const DUMP_PREFIX: &str = "dump_";

/// Renders the text of one dump from the context.
pub type DumpProducer<C> = Arc<dyn Fn(&C) -> anyhow::Result<String> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Invalid dump_type \"{kind}\"")]
    UnknownKind { kind: String, valid: Vec<String> },

    #[error("Invalid dump filename \"{0}\"")]
    InvalidFilename(String),

    #[error("Dump \"{kind}\" failed: {message}")]
    ProducerFailed { kind: String, message: String },

    #[error("Failed to write dump {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct DumpRegistry<C> {
    dump_dir: PathBuf,
    producers: BTreeMap<String, DumpProducer<C>>,
}

impl<C> Clone for DumpRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            dump_dir: self.dump_dir.clone(),
            producers: self.producers.clone(),
        }
    }
}

impl<C> DumpRegistry<C> {
    pub fn new(dump_dir: PathBuf) -> Self {
        Self {
            dump_dir,
            producers: BTreeMap::new(),
        }
    }

    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    /// Add or replace the producer for `kind`.
    pub fn register<F>(&mut self, kind: &str, producer: F) -> &mut Self
    where
        F: Fn(&C) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.producers
            .insert(format!("{}{}", DUMP_PREFIX, kind), Arc::new(producer));
        self
    }

    pub fn with<F>(mut self, kind: &str, producer: F) -> Self
    where
        F: Fn(&C) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.register(kind, producer);
        self
    }

    /// Producer identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        self.producers.keys().map(String::as_str).collect()
    }

    /// Valid dump kinds: identifiers without the `dump_` prefix.
    pub fn kinds(&self) -> Vec<String> {
        self.producers
            .keys()
            .map(|id| id.strip_prefix(DUMP_PREFIX).unwrap_or(id).to_string())
            .collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.producers
            .contains_key(&format!("{}{}", DUMP_PREFIX, kind))
    }

    /// File a dump named `filename` is written to.
    pub fn destination(&self, filename: &str) -> PathBuf {
        self.dump_dir.join(format!("{}.txt", filename))
    }

    /// Run the producer for `kind` and write its output to `destination(filename)`.
    pub fn dump(&self, ctx: &C, kind: &str, filename: &str) -> Result<PathBuf, DumpError> {
        let Some(producer) = self.producers.get(&format!("{}{}", DUMP_PREFIX, kind)) else {
            return Err(DumpError::UnknownKind {
                kind: kind.to_string(),
                valid: self.kinds(),
            });
        };

        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(DumpError::InvalidFilename(filename.to_string()));
        }

        let contents = producer(ctx).map_err(|e| DumpError::ProducerFailed {
            kind: kind.to_string(),
            message: format!("{:#}", e),
        })?;

        let path = self.destination(filename);
        std::fs::create_dir_all(&self.dump_dir)
            .and_then(|_| std::fs::write(&path, contents))
            .map_err(|source| DumpError::Write {
                path: path.clone(),
                source,
            })?;

        info!(kind, path = ?path, "wrote dump");
        Ok(path)
    }

    /// `dump`, with every failure reported to the logger instead of returned.
    pub fn dump_logged(&self, ctx: &C, logger: &CommandLogger, kind: &str, filename: &str) {
        match self.dump(ctx, kind, filename) {
            Ok(_) => {}
            Err(DumpError::UnknownKind { kind, valid }) => {
                logger.log_message(&format!(
                    "Invalid dump_type \"{}\". The valid types are:",
                    kind
                ));
                for valid_kind in valid {
                    logger.log_message(&format!("\t{}", valid_kind));
                }
            }
            Err(e) => {
                error!("{}", e);
                logger.diagnostic(&e.to_string());
            }
        }
    }
}

/// Dump registry with the producers every core ships: `config`, `delays`
/// and `plugins`.
pub fn core_dumps(dump_dir: PathBuf) -> DumpRegistry<CoreState> {
    DumpRegistry::new(dump_dir)
        .with("config", dump_config)
        .with("delays", dump_delays)
        .with("plugins", dump_plugins)
}

fn dump_config(state: &CoreState) -> anyhow::Result<String> {
    Ok(state.config.to_toml_string()?)
}

fn dump_delays(state: &CoreState) -> anyhow::Result<String> {
    let pending = state.delays.pending();
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "now": state.delays.now(),
        "pending": pending,
    }))?)
}

fn dump_plugins(state: &CoreState) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "plugins": state.plugins.summaries(),
        "auth_backends": state.auth.summaries(),
    }))?)
}
