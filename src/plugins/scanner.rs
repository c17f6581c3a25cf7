// Plugin Scanner - Resolves plugins from directories on the filesystem
//
// A plugin unit is `<plugins_dir>/<name>/`. An optional `manifest.json`
// object in that directory supplies the metadata block; behavior comes from
// a factory registered under the same name.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::loader::{FactoryLoader, PluginContext, PluginLoader, PluginUnit};
use super::types::{is_valid_plugin_name, PluginError, PluginInfo, StaticVariable};

pub const MANIFEST_FILE: &str = "manifest.json";

pub struct DirectoryLoader {
    plugins_dir: PathBuf,
    factories: FactoryLoader,
}

impl DirectoryLoader {
    pub fn new(plugins_dir: PathBuf, factories: FactoryLoader) -> Self {
        Self {
            plugins_dir,
            factories,
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.plugins_dir.join(name)
    }

    /// Read the manifest of a plugin directory, if it has one.
    pub fn read_manifest(&self, name: &str, dir: &Path) -> Result<Option<PluginInfo>, PluginError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&manifest_path)?;
        let value: Value = serde_json::from_str(&content)?;
        let Value::Object(map) = value else {
            return Err(PluginError::InvalidManifest {
                name: name.to_string(),
                message: "manifest must be a JSON object".to_string(),
            });
        };

        Ok(Some(info_from_manifest(map)))
    }
}

impl PluginLoader for DirectoryLoader {
    fn load(&self, name: &str) -> Result<Box<dyn PluginUnit>, PluginError> {
        let dir = self.plugin_dir(name);
        if !dir.is_dir() {
            return Err(PluginError::NotFound {
                name: name.to_string(),
                path: dir,
            });
        }

        let info = self.read_manifest(name, &dir)?;
        debug!(plugin = name, dir = ?dir, has_manifest = info.is_some(), "resolved plugin directory");

        let inner = self.factories.create(name).transpose()?;
        Ok(Box::new(DirectoryPlugin { info, inner }))
    }

    fn available(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.plugins_dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_valid_plugin_name(name))
            .collect();
        names.sort();
        names
    }
}

/// Manifest metadata wrapped around the factory-built unit, if any.
struct DirectoryPlugin {
    info: Option<PluginInfo>,
    inner: Option<Box<dyn PluginUnit>>,
}

impl PluginUnit for DirectoryPlugin {
    fn info(&self) -> Option<&PluginInfo> {
        self.inner
            .as_ref()
            .and_then(|unit| unit.info())
            .or(self.info.as_ref())
    }

    fn on_load(&mut self, ctx: &PluginContext<'_>) -> anyhow::Result<()> {
        match self.inner.as_mut() {
            Some(unit) => unit.on_load(ctx),
            None => Ok(()),
        }
    }

    fn on_unload(&mut self, ctx: &PluginContext<'_>) -> anyhow::Result<()> {
        match self.inner.as_mut() {
            Some(unit) => unit.on_unload(ctx),
            None => Ok(()),
        }
    }
}

/// Build a metadata block from manifest keys, in file order.
///
/// Objects carrying `name` and `value` become console variables (`help` is
/// the help text); strings are kept verbatim; anything else is rendered as
/// JSON.
fn info_from_manifest(map: Map<String, Value>) -> PluginInfo {
    let mut info = PluginInfo::new();
    for (key, value) in map {
        match value {
            Value::String(text) => info.insert(key, text),
            Value::Object(ref fields) if fields.contains_key("name") && fields.contains_key("value") => {
                info.insert(
                    key,
                    StaticVariable {
                        name: json_text(&fields["name"]),
                        help_text: fields.get("help").map(json_text).unwrap_or_default(),
                        value: json_text(&fields["value"]),
                    },
                );
            }
            other => info.insert(key, other.to_string()),
        }
    }
    info
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{CommandLogger, MemorySink};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn plugin_dir(root: &TempDir, name: &str, manifest: Option<&str>) {
        let dir = root.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(manifest) = manifest {
            std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        }
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let root = TempDir::new().unwrap();
        let loader = DirectoryLoader::new(root.path().to_path_buf(), FactoryLoader::new());

        let err = loader.load("ghost").err().unwrap();
        assert!(matches!(err, PluginError::NotFound { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn test_manifest_metadata_in_file_order() {
        let root = TempDir::new().unwrap();
        plugin_dir(
            &root,
            "alpha",
            Some(
                r#"{
                    "version": "1.2",
                    "author": "Someone",
                    "enabled": {"name": "alpha_enabled", "help": "Enables alpha", "value": 1},
                    "tags": ["a", "b"]
                }"#,
            ),
        );
        let loader = DirectoryLoader::new(root.path().to_path_buf(), FactoryLoader::new());

        let unit = loader.load("alpha").unwrap();
        let info = unit.info().unwrap();
        let rendered: Vec<(String, String)> =
            info.iter().map(|(k, v)| (k.to_string(), v.render())).collect();

        assert_eq!(
            rendered,
            vec![
                ("version".to_string(), "1.2".to_string()),
                ("author".to_string(), "Someone".to_string()),
                ("enabled".to_string(), "alpha_enabled:\n\t\t\tEnables alpha: 1".to_string()),
                ("tags".to_string(), "[\"a\",\"b\"]".to_string()),
            ]
        );
    }

    #[test]
    fn test_directory_without_manifest_has_no_info() {
        let root = TempDir::new().unwrap();
        plugin_dir(&root, "bare", None);
        let loader = DirectoryLoader::new(root.path().to_path_buf(), FactoryLoader::new());

        assert!(loader.load("bare").unwrap().info().is_none());
    }

    #[test]
    fn test_non_object_manifest_rejected() {
        let root = TempDir::new().unwrap();
        plugin_dir(&root, "broken", Some("[1, 2, 3]"));
        let loader = DirectoryLoader::new(root.path().to_path_buf(), FactoryLoader::new());

        let err = loader.load("broken").err().unwrap();
        assert!(matches!(err, PluginError::InvalidManifest { .. }));

        plugin_dir(&root, "garbled", Some("{not json"));
        let err = loader.load("garbled").err().unwrap();
        assert!(matches!(err, PluginError::JsonError(_)));
    }

    #[test]
    fn test_factory_supplies_behavior() {
        struct Failing;
        impl PluginUnit for Failing {
            fn on_load(&mut self, _ctx: &PluginContext<'_>) -> anyhow::Result<()> {
                anyhow::bail!("init failed")
            }
        }

        let root = TempDir::new().unwrap();
        plugin_dir(&root, "failing", Some(r#"{"version": "0.1"}"#));
        let factories =
            FactoryLoader::new().with("failing", |_name: &str| -> anyhow::Result<Box<dyn PluginUnit>> {
                Ok(Box::new(Failing))
            });
        let loader = DirectoryLoader::new(root.path().to_path_buf(), factories);

        let mut unit = loader.load("failing").unwrap();
        assert_eq!(unit.info().unwrap().get("version").unwrap().render(), "0.1");

        let sink = MemorySink::new();
        let logger = CommandLogger::new(Arc::new(sink), "", "test");
        let ctx = PluginContext {
            name: "failing",
            logger: &logger,
        };
        assert!(unit.on_load(&ctx).is_err());
    }

    #[test]
    fn test_available_lists_valid_directories() {
        let root = TempDir::new().unwrap();
        plugin_dir(&root, "zeta", None);
        plugin_dir(&root, "alpha", None);
        plugin_dir(&root, "not-valid", None);
        std::fs::write(root.path().join("loose_file"), "x").unwrap();

        let loader = DirectoryLoader::new(root.path().to_path_buf(), FactoryLoader::new());
        assert_eq!(loader.available(), vec!["alpha", "zeta"]);
    }
}
