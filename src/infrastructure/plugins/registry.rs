//! Plugin registry - name and command indexes over loaded plugins

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::application::errors::BotError;
use super::record::PluginRecord;

/// In-memory plugin indexes: name -> record and command keyword -> record.
///
/// Constructed once per process and passed by reference into the loader and
/// dispatcher; tests may build as many independent registries as they like.
///
/// Collision policy: a command keyword maps to at most one record, and
/// registering a colliding keyword silently overwrites the previous mapping.
/// Last write wins; there is no undo stack (unloading the winner does not
/// restore the loser's mapping).
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<PluginRecord>>>,
    commands: RwLock<HashMap<String, Arc<PluginRecord>>>,
    /// Registration order of plugin names; drives hook fan-out order
    order: RwLock<Vec<String>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            commands: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Register a record under its name and every command keyword it declares.
    ///
    /// Replacing an existing name keeps its fan-out position but does NOT
    /// clean up the old record's keyword mappings; callers wanting a clean
    /// replace go through `unregister` first (the loader's reload does).
    pub fn register(&self, record: PluginRecord) -> Result<Arc<PluginRecord>, BotError> {
        let record = Arc::new(record);
        let keywords = record.keywords();

        {
            let mut plugins = self
                .plugins
                .write()
                .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
            let mut order = self
                .order
                .write()
                .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;

            if plugins.insert(record.name.clone(), record.clone()).is_none() {
                order.push(record.name.clone());
            }
        }

        let mut commands = self
            .commands
            .write()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
        for keyword in keywords {
            if let Some(previous) = commands.insert(keyword.clone(), record.clone()) {
                if previous.name != record.name {
                    debug!(
                        keyword = %keyword,
                        old = %previous.name,
                        new = %record.name,
                        "command keyword overwritten"
                    );
                }
            }
        }

        Ok(record)
    }

    /// Remove the name entry and every command mapping pointing at it
    pub fn unregister(&self, name: &str) -> bool {
        let removed = {
            let mut plugins = match self.plugins.write() {
                Ok(p) => p,
                Err(_) => return false,
            };
            plugins.remove(name)
        };

        let Some(record) = removed else {
            return false;
        };

        if let Ok(mut order) = self.order.write() {
            order.retain(|n| n != name);
        }

        if let Ok(mut commands) = self.commands.write() {
            commands.retain(|_, rec| !Arc::ptr_eq(rec, &record));
        }

        true
    }

    /// Toggle a plugin without removing it from the indexes
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), BotError> {
        let plugins = self
            .plugins
            .read()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
        let record = plugins
            .get(name)
            .ok_or_else(|| BotError::NotFound(format!("plugin '{}'", name)))?;
        record.set_enabled(enabled);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<PluginRecord>> {
        self.plugins.read().ok()?.get(name).cloned()
    }

    /// Resolve a command keyword. Disabled plugins remain resolvable here so
    /// callers can distinguish "disabled" from "unknown"; the dispatcher is
    /// what treats disabled as invisible.
    pub fn find_by_command(&self, keyword: &str) -> Option<Arc<PluginRecord>> {
        self.commands.read().ok()?.get(&keyword.to_lowercase()).cloned()
    }

    /// Snapshot of every record in registration order
    pub fn all(&self) -> Vec<Arc<PluginRecord>> {
        let plugins = match self.plugins.read() {
            Ok(p) => p,
            Err(_) => return Vec::new(),
        };
        let order = match self.order.read() {
            Ok(o) => o,
            Err(_) => return Vec::new(),
        };
        order.iter().filter_map(|n| plugins.get(n).cloned()).collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<Arc<PluginRecord>> {
        self.all()
            .into_iter()
            .filter(|p| p.category == category)
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for plugin in self.all() {
            if !categories.contains(&plugin.category) {
                categories.push(plugin.category.clone());
            }
        }
        categories
    }

    /// All registered command keywords
    pub fn command_keywords(&self) -> Vec<String> {
        self.commands
            .read()
            .ok()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().ok().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
