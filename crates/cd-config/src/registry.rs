//! Name → instance lookup for live configurations.
//!
//! The registry holds `Weak` handles: once every owner of a configuration
//! drops its handle, the entry resolves to absent. Stale entries are
//! overwritten on the next registration under that name, or removed with
//! [`Registry::prune`] / [`Registry::unregister`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};

use cd_core::Result;
use tracing::debug;

use crate::config::{ConfigDict, SharedConfig};
use crate::name::check_name;

/// Lock a shared configuration, recovering the data if a previous holder
/// panicked.
pub fn lock(handle: &SharedConfig) -> MutexGuard<'_, ConfigDict> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of live configurations, keyed by normalized name.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, Weak<Mutex<ConfigDict>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`ConfigDict::open`].
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Weak<Mutex<ConfigDict>>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn register(&self, name: &str, handle: &SharedConfig) {
        let previous = self
            .entries()
            .insert(name.to_string(), Arc::downgrade(handle));
        if previous.is_some() {
            debug!(name, "registry entry replaced");
        }
    }

    /// Live handle registered under an already normalized name.
    pub(crate) fn lookup(&self, name: &str) -> Option<SharedConfig> {
        self.entries().get(name).and_then(Weak::upgrade)
    }

    /// Retrieve a previously opened configuration.
    ///
    /// This does not load anything from disk: a saved file alone does not
    /// define a configuration without its defaults.
    pub fn get(&self, name: &str) -> Result<Option<SharedConfig>> {
        let name = check_name(name)?;
        Ok(self.lookup(&name))
    }

    /// Whether a live configuration is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        check_name(name).is_ok_and(|name| self.lookup(&name).is_some())
    }

    /// Remove the entry for `name`. Returns whether an entry existed.
    pub fn unregister(&self, name: &str) -> bool {
        match check_name(name) {
            Ok(name) => self.entries().remove(&name).is_some(),
            Err(_) => false,
        }
    }

    /// Drop entries whose configuration no longer exists. Returns how many
    /// were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    /// Sorted names of all live configurations.
    pub fn active(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Reload every live configuration saved at `path`.
    ///
    /// Entry point for a file watcher. Returns the names that were reloaded.
    pub fn notify_file_changed(&self, path: &Path) -> Result<Vec<String>> {
        let handles: Vec<(String, SharedConfig)> = self
            .entries()
            .iter()
            .filter_map(|(name, weak)| weak.upgrade().map(|h| (name.clone(), h)))
            .collect();
        let mut reloaded = Vec::new();
        for (name, handle) in handles {
            if lock(&handle).on_file_changed(path)? {
                reloaded.push(name);
            }
        }
        reloaded.sort();
        Ok(reloaded)
    }
}
