// Plugin Management Module - Loading, unloading and listing plugin units
// The manager owns the loaded set; loaders turn a name into a unit.

pub mod loader;
pub mod manager;
pub mod scanner;
pub mod types;


pub use loader::{FactoryLoader, InertPlugin, PluginContext, PluginFactory, PluginLoader, PluginUnit};
pub use manager::{PluginManager, PluginManagerConfig};
pub use scanner::DirectoryLoader;
pub use types::{
    is_valid_plugin_name, ConsoleVariable, InfoValue, PluginError, PluginInfo, PluginRecord,
    PluginSummary, StaticVariable,
};
