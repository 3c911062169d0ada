use super::ScannerPlugin;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub supported_targets: Vec<String>,
}

/// Directory of scanner plugins by name.
///
/// Knows nothing about concrete scanners; the composition root registers
/// them (see `crate::scanners::register_builtin`).
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<String, Arc<dyn ScannerPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<dyn ScannerPlugin>>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register under the plugin's own name. A later registration for the same
    /// name replaces the earlier one, which is returned.
    pub fn register(&self, plugin: Arc<dyn ScannerPlugin>) -> Option<Arc<dyn ScannerPlugin>> {
        let name = plugin.name().to_string();
        self.insert(name, plugin)
    }

    /// Register the plugin built by `factory` under `name`.
    pub fn register_factory<F>(&self, name: &str, factory: F) -> Option<Arc<dyn ScannerPlugin>>
    where
        F: FnOnce() -> Arc<dyn ScannerPlugin>,
    {
        self.insert(name.to_string(), factory())
    }

    fn insert(&self, name: String, plugin: Arc<dyn ScannerPlugin>) -> Option<Arc<dyn ScannerPlugin>> {
        debug!(plugin = %name, "Registering scanner plugin");
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, plugin)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn ScannerPlugin>> {
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScannerPlugin>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Name and description of every plugin, sorted by registered name.
    pub fn list(&self) -> Vec<PluginInfo> {
        self.read()
            .iter()
            .map(|(name, plugin)| PluginInfo {
                name: name.clone(),
                description: plugin.description().to_string(),
                supported_targets: plugin
                    .supported_targets()
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
            })
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<dyn ScannerPlugin>> {
        self.read().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
