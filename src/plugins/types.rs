// Plugin types and data structures

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::loader::PluginUnit;
use crate::logging::CommandLogger;

/// A named, configurable host variable exposed in plugin metadata.
pub trait ConsoleVariable: Send + Sync {
    fn name(&self) -> String;
    fn help_text(&self) -> String;
    fn get_string(&self) -> String;
}

/// Console variable with fixed values, as declared in a plugin manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticVariable {
    pub name: String,
    pub help_text: String,
    pub value: String,
}

impl ConsoleVariable for StaticVariable {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn help_text(&self) -> String {
        self.help_text.clone()
    }

    fn get_string(&self) -> String {
        self.value.clone()
    }
}

#[derive(Clone)]
pub enum InfoValue {
    Text(String),
    Variable(Arc<dyn ConsoleVariable>),
}

impl InfoValue {
    /// Text shown for this value in the plugin listing.
    pub fn render(&self) -> String {
        match self {
            InfoValue::Text(text) => text.clone(),
            InfoValue::Variable(var) => format!(
                "{}:\n\t\t\t{}: {}",
                var.name(),
                var.help_text(),
                var.get_string()
            ),
        }
    }
}

impl std::fmt::Debug for InfoValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfoValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            InfoValue::Variable(var) => f.debug_tuple("Variable").field(&var.name()).finish(),
        }
    }
}

impl From<&str> for InfoValue {
    fn from(value: &str) -> Self {
        InfoValue::Text(value.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(value: String) -> Self {
        InfoValue::Text(value)
    }
}

impl From<StaticVariable> for InfoValue {
    fn from(value: StaticVariable) -> Self {
        InfoValue::Variable(Arc::new(value))
    }
}

/// Metadata block of a plugin, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PluginInfo {
    items: Vec<(String, InfoValue)>,
}

impl PluginInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`. Re-setting a key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<InfoValue>) {
        let key = key.into();
        let value = value.into();
        match self.items.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.items.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<InfoValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoValue)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A loaded plugin instance owned by the manager.
pub struct PluginRecord {
    pub name: String,
    pub unit: Box<dyn PluginUnit>,
    pub logger: CommandLogger,
    pub loaded_at: DateTime<Utc>,
}

impl PluginRecord {
    pub fn info(&self) -> Option<&PluginInfo> {
        self.unit.info()
    }
}

/// Serializable snapshot of a loaded plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    pub name: String,
    pub loaded_at: DateTime<Utc>,
    pub info: Vec<(String, String)>,
}

impl From<&PluginRecord> for PluginSummary {
    fn from(record: &PluginRecord) -> Self {
        Self {
            name: record.name.clone(),
            loaded_at: record.loaded_at,
            info: record
                .info()
                .map(|info| info.iter().map(|(k, v)| (k.to_string(), v.render())).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid plugin name: {0}")]
    InvalidName(String),

    #[error("Plugin already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("Plugin not loaded: {0}")]
    NotLoaded(String),

    #[error("Plugin not found: {name} ({path})")]
    NotFound { name: String, path: PathBuf },

    #[error("Invalid manifest for {name}: {message}")]
    InvalidManifest { name: String, message: String },

    #[error("Failed to load {name}: {message}")]
    LoadFailed { name: String, message: String },

    #[error("Failed to unload {name}: {message}")]
    TeardownFailed { name: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Plugin names must be identifiers: an ASCII letter or `_` followed by
/// ASCII alphanumerics or `_`.
pub fn is_valid_plugin_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_name_validation() {
        assert!(is_valid_plugin_name("alpha"));
        assert!(is_valid_plugin_name("_hidden2"));
        assert!(is_valid_plugin_name("Zeta_9"));

        assert!(!is_valid_plugin_name(""));
        assert!(!is_valid_plugin_name("9lives"));
        assert!(!is_valid_plugin_name("has-dash"));
        assert!(!is_valid_plugin_name("../escape"));
        assert!(!is_valid_plugin_name("dotted.name"));
    }

    #[test]
    fn test_info_keeps_insertion_order_and_replaces_in_place() {
        let mut info = PluginInfo::new().with("version", "1.0").with("author", "someone");
        info.insert("version", "2.0");

        let keys: Vec<&str> = info.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["version", "author"]);
        assert_eq!(info.get("version").unwrap().render(), "2.0");
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn test_variable_rendering() {
        let value: InfoValue = StaticVariable {
            name: "alpha_enabled".into(),
            help_text: "Enables alpha".into(),
            value: "1".into(),
        }
        .into();

        assert_eq!(value.render(), "alpha_enabled:\n\t\t\tEnables alpha: 1");
    }
}
