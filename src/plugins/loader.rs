// Plugin Loader - Resolves plugin names to loadable units

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{PluginError, PluginInfo};
use crate::logging::CommandLogger;

/// Passed to a unit's lifecycle hooks.
pub struct PluginContext<'a> {
    pub name: &'a str,
    pub logger: &'a CommandLogger,
}

/// An independently loadable extension.
pub trait PluginUnit {
    fn info(&self) -> Option<&PluginInfo> {
        None
    }

    /// Initialization. An error aborts the load and discards the unit.
    fn on_load(&mut self, _ctx: &PluginContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Teardown. Errors are reported but never keep the plugin loaded.
    fn on_unload(&mut self, _ctx: &PluginContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub trait PluginLoader {
    /// Build a fresh, not yet initialized unit for `name`.
    fn load(&self, name: &str) -> Result<Box<dyn PluginUnit>, PluginError>;

    /// Names this loader can resolve, sorted.
    fn available(&self) -> Vec<String> {
        Vec::new()
    }
}

pub type PluginFactory =
    Arc<dyn Fn(&str) -> anyhow::Result<Box<dyn PluginUnit>> + Send + Sync>;

/// Loader backed by in-process constructors.
#[derive(Default, Clone)]
pub struct FactoryLoader {
    factories: HashMap<String, PluginFactory>,
}

impl FactoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str) -> anyhow::Result<Box<dyn PluginUnit>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Box<dyn PluginUnit>> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Run the factory for `name`, if there is one.
    pub fn create(&self, name: &str) -> Option<Result<Box<dyn PluginUnit>, PluginError>> {
        let factory = self.factories.get(name)?;
        Some(factory(name).map_err(|e| PluginError::LoadFailed {
            name: name.to_string(),
            message: format!("{:#}", e),
        }))
    }
}

impl PluginLoader for FactoryLoader {
    fn load(&self, name: &str) -> Result<Box<dyn PluginUnit>, PluginError> {
        self.create(name).unwrap_or_else(|| {
            Err(PluginError::NotFound {
                name: name.to_string(),
                path: name.into(),
            })
        })
    }

    fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Unit with metadata and no behavior.
#[derive(Debug, Default, Clone)]
pub struct InertPlugin {
    info: Option<PluginInfo>,
}

impl InertPlugin {
    pub fn new(info: Option<PluginInfo>) -> Self {
        Self { info }
    }
}

impl PluginUnit for InertPlugin {
    fn info(&self) -> Option<&PluginInfo> {
        self.info.as_ref()
    }
}
