// Credits - Grouped name/value metadata store and the credits report

use std::path::{Path, PathBuf};

/// Name column width in the credits report.
const NAME_WIDTH: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum CreditsError {
    #[error("Failed to read credits {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse credits: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Credits group \"{0}\" must be a table")]
    InvalidGroup(String),
}

/// One section of the credits, entries in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreditGroup {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl CreditGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }
}

/// Key-grouped name/value text store.
pub trait CreditsStore {
    fn groups(&self) -> Result<Vec<CreditGroup>, CreditsError>;
}

/// Credits kept in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCredits(pub Vec<CreditGroup>);

impl CreditsStore for StaticCredits {
    fn groups(&self) -> Result<Vec<CreditGroup>, CreditsError> {
        Ok(self.0.clone())
    }
}

/// Credits read from a TOML file on every request. Each top-level table is
/// a group; its keys are the names.
#[derive(Debug, Clone)]
pub struct TomlCreditsFile {
    path: PathBuf,
}

impl TomlCreditsFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CreditsStore for TomlCreditsFile {
    fn groups(&self) -> Result<Vec<CreditGroup>, CreditsError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CreditsError::Read {
            path: self.path.clone(),
            source,
        })?;
        parse_credits(&content)
    }
}

pub fn parse_credits(content: &str) -> Result<Vec<CreditGroup>, CreditsError> {
    let table: toml::Table = toml::from_str(content)?;

    table
        .into_iter()
        .map(|(group, value)| {
            let toml::Value::Table(names) = value else {
                return Err(CreditsError::InvalidGroup(group));
            };
            let entries = names
                .into_iter()
                .map(|(name, value)| {
                    let text = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    (name, text)
                })
                .collect();
            Ok(CreditGroup {
                name: group,
                entries,
            })
        })
        .collect()
}

/// The credits report: header and separator, one block per group with
/// names padded to 20 columns, closing separator.
pub fn format_credits(prefix: &str, separator: &str, groups: &[CreditGroup]) -> String {
    let mut message = format!("{}Credits\n{}\n\n", prefix, separator);

    for group in groups {
        message.push('\t');
        message.push_str(&group.name);
        message.push_str(":\n");
        for (name, value) in &group.entries {
            message.push_str(&format!("\t\t{:<width$}{}\n", name, value, width = NAME_WIDTH));
        }
        message.push('\n');
    }

    message.push_str(separator);
    message.push_str("\n\n");
    message
}
