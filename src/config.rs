// Core Configuration - TOML settings for the sp command and its collaborators

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Top-level console command name.
    pub command: String,
    pub description: String,
    /// Prepended to diagnostics and report headers.
    pub prefix: String,
    pub project_name: String,
    pub version: String,
    /// Width of the `=` separator lines in reports.
    pub separator_width: usize,
    pub tick_interval_ms: u64,
    pub paths: PathsConfig,
    pub docs: DocsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub plugins_dir: PathBuf,
    pub auth_dir: PathBuf,
    pub credits_file: PathBuf,
    pub dump_dir: PathBuf,
    pub docs_project_dir: PathBuf,
    pub docs_output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocsConfig {
    pub builder: String,
    pub args: Vec<String>,
    pub author: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            command: "sp".to_string(),
            description: "Source.Python base command.".to_string(),
            prefix: "[SP] ".to_string(),
            project_name: "Source.Python".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            separator_width: 61,
            tick_interval_ms: 15,
            paths: PathsConfig::default(),
            docs: DocsConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let root = default_data_root();
        Self {
            plugins_dir: root.join("plugins"),
            auth_dir: root.join("auth"),
            credits_file: root.join("data").join("credits.toml"),
            dump_dir: root.join("logs"),
            docs_project_dir: root.join("packages"),
            docs_output_dir: root.join("docs"),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            builder: "sphinx-build".to_string(),
            args: Vec::new(),
            author: "Source.Python Development Team".to_string(),
        }
    }
}

fn default_data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sp-console")
}

impl CoreConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() || self.command.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "command name must be a single word, got {:?}",
                self.command
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// A full line of separator characters.
    pub fn separator(&self) -> String {
        "=".repeat(self.separator_width)
    }
}
