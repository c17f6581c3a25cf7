// Plugin Manager - Manages plugin lifecycle and operations
//
// The manager is the single source of truth for which plugins are loaded.
// A load either completes and inserts a record or leaves the manager
// exactly as it was. An unload always removes the record, even when the
// plugin's teardown fails.

use chrono::Utc;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

use super::loader::{PluginContext, PluginLoader};
use super::types::{is_valid_plugin_name, PluginError, PluginRecord, PluginSummary};
use crate::commands::registry::panic_message;
use crate::logging::CommandLogger;

/// Everything injected into a manager at construction.
pub struct PluginManagerConfig {
    pub logger: CommandLogger,
    pub loader: Box<dyn PluginLoader>,
    /// What the managed units are called in messages, e.g. "plugin".
    pub noun: String,
}

impl PluginManagerConfig {
    pub fn new(logger: CommandLogger, loader: Box<dyn PluginLoader>) -> Self {
        Self {
            logger,
            loader,
            noun: "plugin".to_string(),
        }
    }

    pub fn with_noun(mut self, noun: impl Into<String>) -> Self {
        self.noun = noun.into();
        self
    }
}

pub struct PluginManager {
    plugins: BTreeMap<String, PluginRecord>,
    loader: Box<dyn PluginLoader>,
    logger: CommandLogger,
    noun: String,
}

impl PluginManager {
    pub fn new(config: PluginManagerConfig) -> Self {
        Self {
            plugins: BTreeMap::new(),
            loader: config.loader,
            logger: config.logger,
            noun: config.noun,
        }
    }

    pub fn logger(&self) -> &CommandLogger {
        &self.logger
    }

    pub fn noun(&self) -> &str {
        &self.noun
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.plugins.get(name)
    }

    /// Loaded plugin names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Names the loader can resolve.
    pub fn available(&self) -> Vec<String> {
        self.loader.available()
    }

    pub fn summaries(&self) -> Vec<PluginSummary> {
        self.plugins.values().map(PluginSummary::from).collect()
    }

    /// Load a plugin. Failures are logged and returned; state is unchanged
    /// unless the load succeeds.
    pub fn load(&mut self, name: &str) -> Result<(), PluginError> {
        if !is_valid_plugin_name(name) {
            self.logger
                .diagnostic(&format!("Invalid {} name '{}'.", self.noun, name));
            return Err(PluginError::InvalidName(name.to_string()));
        }

        if self.is_loaded(name) {
            self.logger.diagnostic(&format!(
                "{} '{}' is already loaded.",
                capitalize(&self.noun),
                name
            ));
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }

        self.logger
            .diagnostic(&format!("Loading {} '{}'...", self.noun, name));

        let mut unit = match self.loader.load(name) {
            Ok(unit) => unit,
            Err(e) => {
                warn!(plugin = name, "failed to resolve: {}", e);
                self.logger.diagnostic(&format!(
                    "Unable to load {} '{}': {}",
                    self.noun, name, e
                ));
                return Err(e);
            }
        };

        let logger = self.logger.child(name);
        let ctx = PluginContext {
            name,
            logger: &logger,
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| unit.on_load(&ctx)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
        };

        if let Some(message) = failure {
            error!(plugin = name, "initialization failed: {}", message);
            self.logger.diagnostic(&format!(
                "{} '{}' was unable to be loaded: {}",
                capitalize(&self.noun),
                name,
                message
            ));
            return Err(PluginError::LoadFailed {
                name: name.to_string(),
                message,
            });
        }

        self.plugins.insert(
            name.to_string(),
            PluginRecord {
                name: name.to_string(),
                unit,
                logger,
                loaded_at: Utc::now(),
            },
        );

        info!(plugin = name, "loaded");
        self.logger
            .diagnostic(&format!("Successfully loaded {} '{}'.", self.noun, name));
        Ok(())
    }

    /// Unload a plugin. Teardown errors are logged and the record is removed
    /// regardless.
    pub fn unload(&mut self, name: &str) -> Result<(), PluginError> {
        let Some(mut record) = self.plugins.remove(name) else {
            self.logger.diagnostic(&format!(
                "{} '{}' is not loaded.",
                capitalize(&self.noun),
                name
            ));
            return Err(PluginError::NotLoaded(name.to_string()));
        };

        self.logger
            .diagnostic(&format!("Unloading {} '{}'...", self.noun, name));

        let ctx = PluginContext {
            name,
            logger: &record.logger,
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| record.unit.on_unload(&ctx)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
        };

        if let Some(message) = failure {
            let e = PluginError::TeardownFailed {
                name: name.to_string(),
                message,
            };
            error!(plugin = name, "{}", e);
            self.logger.diagnostic(&format!(
                "Error while unloading {} '{}': {}",
                self.noun, name, e
            ));
        }

        drop(record);
        info!(plugin = name, "unloaded");
        self.logger
            .diagnostic(&format!("Successfully unloaded {} '{}'.", self.noun, name));
        Ok(())
    }

    /// Unload then load. A plugin that is not loaded is simply loaded.
    pub fn reload(&mut self, name: &str) -> Result<(), PluginError> {
        if self.is_loaded(name) {
            self.unload(name)?;
        } else {
            debug!(plugin = name, "reload of unloaded plugin, loading");
        }
        self.load(name)
    }

    /// Unload every plugin, last name first.
    pub fn unload_all(&mut self) {
        let names: Vec<String> = self.plugins.keys().rev().cloned().collect();
        for name in names {
            let _ = self.unload(&name);
        }
    }

    /// The plugin listing: header, one block per plugin sorted by name,
    /// footer.
    pub fn list_report(&self, separator: &str) -> String {
        let mut message = format!(
            "{}Loaded {}s:\n{}\n\n",
            self.logger.prefix(),
            self.noun,
            separator
        );

        for (name, record) in &self.plugins {
            match record.info() {
                Some(info) => {
                    message.push_str(name);
                    message.push_str(":\n");
                    for (item, value) in info.iter() {
                        message.push_str(&format!("\t{}:\n\t\t{}\n", item, value.render()));
                    }
                }
                None => {
                    message.push_str(name);
                    message.push('\n');
                }
            }
            message.push('\n');
        }

        message.push_str(separator);
        message
    }

    pub fn print_list(&self, separator: &str) {
        self.logger.log_message(&self.list_report(separator));
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
