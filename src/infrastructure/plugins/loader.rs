//! Plugin loader - discovers, imports, and hot-reloads plugins

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use libloading::{Library, Symbol};
use tracing::{error, info, warn};

use crate::application::errors::BotError;
use crate::infrastructure::config::Config;
use super::record::{InitParams, PluginDescriptor, PluginRecord};
use super::registry::PluginRegistry;

/// Symbol every plugin library must export
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"relaybot_plugin_entry";

/// Entry function signature: returns a heap-allocated descriptor, or null
/// to decline loading
pub type PluginEntryFn = unsafe extern "C" fn() -> *mut PluginDescriptor;

/// File stem suffix that marks a plugin as explicitly disabled on disk
const DISABLED_SUFFIX: &str = ".disabled";

/// Loads plugin libraries from a directory tree into a registry.
///
/// Each (re)load of a source file gets a fresh load generation; the library
/// handle is kept for the plugin's lifetime and retired (kept resident, not
/// dropped) on unload so in-flight handlers never outlive their code.
pub struct PluginLoader {
    registry: Arc<PluginRegistry>,
    config: Arc<Config>,
    generation: AtomicU64,
    libraries: Mutex<HashMap<String, Library>>,
    /// Unloaded libraries stay resident; there is no teardown hook, and a
    /// handler captured by the transport in `init` may still run later.
    retired: Mutex<Vec<Library>>,
}

impl PluginLoader {
    pub fn new(registry: Arc<PluginRegistry>, config: Arc<Config>) -> Self {
        Self {
            registry,
            config,
            generation: AtomicU64::new(0),
            libraries: Mutex::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Recursively collect eligible plugin libraries under `dir`, skipping
    /// files whose stem carries the `.disabled` suffix. Traversal order is
    /// filesystem order and not guaranteed stable.
    pub fn plugin_files(dir: &Path) -> Vec<PathBuf> {
        let mut results = Vec::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return results,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                results.extend(Self::plugin_files(&path));
                continue;
            }
            if is_plugin_file(&path) {
                results.push(path);
            }
        }

        results
    }

    /// Load every eligible plugin under the configured plugins directory.
    /// One malformed plugin never prevents the rest from loading.
    pub async fn load_all(&self) -> usize {
        let dir = self.config.plugins.directory.clone();

        if !dir.exists() {
            warn!(dir = %dir.display(), "plugins directory not found, creating");
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!(dir = %dir.display(), error = %e, "failed to create plugins directory");
            }
            return 0;
        }

        let files = Self::plugin_files(&dir);
        info!("loading {} plugin file(s)", files.len());

        let mut loaded = 0;
        for path in files {
            match self.load_one(&path).await {
                Ok(Some(_)) => loaded += 1,
                Ok(None) => {}
                Err(e) => {
                    error!(file = %path.display(), error = %e, "failed to load plugin");
                }
            }
        }

        info!("loaded {} plugin(s)", self.registry.len());
        loaded
    }

    /// Load a single plugin library.
    ///
    /// Opens the library fresh (every call is a new load, which is what
    /// makes hot-reload work), resolves the entry symbol, and normalizes
    /// the returned descriptor. A library without the entry symbol, or one
    /// whose entry returns null, is skipped with a warning rather than
    /// treated as fatal. The record is registered before `init` runs, so
    /// `init` can already be reached through the registry; an `init`
    /// failure is logged and does not undo the registration.
    pub async fn load_one(&self, path: &Path) -> Result<Option<Arc<PluginRecord>>, BotError> {
        let library = unsafe {
            Library::new(path)
                .map_err(|e| BotError::PluginLoad(format!("{}: {}", path.display(), e)))?
        };

        // The symbol borrows the library; keep it scoped so the library can
        // move into the keep-alive map afterwards.
        let descriptor = {
            let entry: Symbol<PluginEntryFn> = match unsafe { library.get(PLUGIN_ENTRY_SYMBOL) } {
                Ok(entry) => entry,
                Err(_) => {
                    warn!(file = %path.display(), "skipped: no plugin entry symbol");
                    return Ok(None);
                }
            };

            unsafe {
                let ptr = entry();
                if ptr.is_null() {
                    warn!(file = %path.display(), "skipped: plugin entry returned null");
                    return Ok(None);
                }
                *Box::from_raw(ptr)
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let record = PluginRecord::from_descriptor(descriptor, Some(path), generation)?;
        let name = record.name.clone();
        let record = self.registry.register(record)?;

        // Keep the library alive for as long as the plugin is loaded. A
        // same-name replacement retires the previous handle instead of
        // dropping it.
        {
            let mut libraries = self
                .libraries
                .lock()
                .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
            if let Some(old) = libraries.insert(name.clone(), library) {
                self.retire(old);
            }
        }

        self.run_init(&record).await;

        info!(plugin = %name, file = %path.display(), generation, "loaded plugin");
        Ok(Some(record))
    }

    /// Register a descriptor built in-process (no backing library). Used
    /// for builtin plugins; not reloadable.
    pub async fn register_builtin(
        &self,
        descriptor: PluginDescriptor,
    ) -> Result<Arc<PluginRecord>, BotError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let record = PluginRecord::from_descriptor(descriptor, None, generation)?;
        let record = self.registry.register(record)?;
        self.run_init(&record).await;
        info!(plugin = %record.name, "registered builtin plugin");
        Ok(record)
    }

    /// Hot-reload a plugin by name: unregister the old record, then re-run
    /// the load on its source file. If the file is now invalid the plugin
    /// is left unloaded; there is no rollback to the previous version.
    pub async fn reload(&self, name: &str) -> Result<(), BotError> {
        let record = self
            .registry
            .get(name)
            .ok_or_else(|| BotError::NotFound(format!("plugin '{}'", name)))?;
        let source = record
            .source
            .clone()
            .ok_or_else(|| BotError::PluginLoad(format!("plugin '{}' is not reloadable", name)))?;

        self.unload(name);

        match self.load_one(&source).await? {
            Some(_) => {
                info!(plugin = %name, "reloaded plugin");
                Ok(())
            }
            None => Err(BotError::PluginLoad(format!(
                "{}: no plugin entry after reload",
                source.display()
            ))),
        }
    }

    /// Unload a plugin: removes the name entry and every command mapping
    /// pointing at it. There is no teardown hook, so anything the plugin
    /// subscribed to in `init` stays subscribed.
    pub fn unload(&self, name: &str) -> bool {
        if !self.registry.unregister(name) {
            return false;
        }

        if let Ok(mut libraries) = self.libraries.lock() {
            if let Some(library) = libraries.remove(name) {
                self.retire(library);
            }
        }

        info!(plugin = %name, "unloaded plugin");
        true
    }

    async fn run_init(&self, record: &Arc<PluginRecord>) {
        let Some(init) = &record.init else {
            return;
        };
        let params = InitParams {
            context: record.context.clone(),
            config: self.config.clone(),
        };
        if let Err(e) = init(params).await {
            error!(plugin = %record.name, error = %e, "plugin init failed");
        }
    }

    fn retire(&self, library: Library) {
        if let Ok(mut retired) = self.retired.lock() {
            retired.push(library);
        } else {
            std::mem::forget(library);
        }
    }
}

/// Eligible plugin files carry the platform dylib extension and are not
/// marked disabled (e.g. `jokes.disabled.so` is left alone).
fn is_plugin_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if ext != std::env::consts::DLL_EXTENSION {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    !stem.ends_with(DISABLED_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dylib(name: &str) -> String {
        format!("{}.{}", name, std::env::consts::DLL_EXTENSION)
    }

    #[test]
    fn eligible_files_filter() {
        assert!(is_plugin_file(Path::new(&dylib("jokes"))));
        assert!(!is_plugin_file(Path::new(&dylib("jokes.disabled"))));
        assert!(!is_plugin_file(Path::new("jokes.txt")));
        assert!(!is_plugin_file(Path::new("jokes")));
    }

    #[test]
    fn discovery_recurses_and_skips_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("fun").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(dir.path().join(dylib("ping")), b"").unwrap();
        std::fs::write(nested.join(dylib("joke")), b"").unwrap();
        std::fs::write(nested.join(dylib("old.disabled")), b"").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"").unwrap();

        let mut found: Vec<String> = PluginLoader::plugin_files(dir.path())
            .into_iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        found.sort();

        assert_eq!(found, vec![dylib("joke"), dylib("ping")]);
    }

    #[test]
    fn discovery_of_missing_dir_is_empty() {
        assert!(PluginLoader::plugin_files(Path::new("/nonexistent/plugins")).is_empty());
    }
}
