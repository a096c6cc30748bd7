//! Persistent, uniquely named configurations.
//!
//! A [`ConfigDict`] wraps a [`CheckedDict`] and keeps it in sync with a file
//! under the user's config directory. Every successful write runs the
//! matching callbacks and rewrites the whole file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cd_core::{CheckedDict, Error, KeySpec, MutationGuard, Result, Validator, Value};
use regex::Regex;
use tracing::{debug, warn};

use crate::editor::ExternalEditor;
use crate::name::{check_name, parse_name};
use crate::registry::Registry;
use crate::resolve::{config_root, storage_path, ConfigRoot};
use crate::storage::{self, Format};

/// Handle shared between the owner(s) of a configuration and the registry.
pub type SharedConfig = Arc<Mutex<ConfigDict>>;

/// Called after a key matching the callback's pattern changed.
pub type Callback = Arc<dyn Fn(&ConfigDict, &str, &Value) + Send + Sync>;

/// Everything needed to open a configuration.
#[derive(Clone)]
pub struct ConfigOptions {
    name: String,
    default: Option<BTreeMap<String, Value>>,
    validator: Validator,
    docs: BTreeMap<String, String>,
    guard: Option<Arc<dyn MutationGuard>>,
    persistent: bool,
    load: bool,
    format: Format,
    config_root: Option<PathBuf>,
}

impl ConfigOptions {
    /// Options for a persistent JSON configuration that loads on open.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            validator: Validator::new(),
            docs: BTreeMap::new(),
            guard: None,
            persistent: true,
            load: true,
            format: Format::Json,
            config_root: None,
        }
    }

    pub fn default(mut self, default: BTreeMap<String, Value>) -> Self {
        self.default = Some(default);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn docs(mut self, docs: BTreeMap<String, String>) -> Self {
        self.docs = docs;
        self
    }

    /// Guard run before every write.
    pub fn guard(mut self, guard: impl MutationGuard + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Whether writes are saved to disk. Defaults to `true`.
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Whether to load the saved file on open. Defaults to `true`; ignored
    /// when no default is given.
    pub fn load(mut self, load: bool) -> Self {
        self.load = load;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Store under `root` instead of the resolved config root.
    pub fn config_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config_root = Some(root.into());
        self
    }
}

/// Result of reconciling a saved file with the current defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// One value per default key.
    pub values: BTreeMap<String, Value>,
    /// Saved keys that are no longer part of the defaults.
    pub stale: Vec<String>,
}

/// Saved values win for keys in both maps, defaults fill the rest and
/// saved-only keys are dropped.
pub fn merge_saved(saved: &BTreeMap<String, Value>, defaults: &BTreeMap<String, Value>) -> Merged {
    let values = defaults
        .iter()
        .map(|(key, default)| {
            let value = saved.get(key).unwrap_or(default);
            (key.clone(), value.clone())
        })
        .collect();
    let stale = saved
        .keys()
        .filter(|key| !defaults.contains_key(*key))
        .cloned()
        .collect();
    Merged { values, stale }
}

/// A named [`CheckedDict`] saved to disk.
///
/// Read access goes through `Deref<Target = CheckedDict>`; writes go through
/// [`set`](Self::set), [`update`](Self::update) and [`reset`](Self::reset).
///
/// Callbacks get a shared reference to the configuration and cannot write to
/// it. Locking the configuration's own [`SharedConfig`] from a callback
/// deadlocks.
pub struct ConfigDict {
    name: String,
    base: Option<String>,
    checked: CheckedDict,
    callbacks: Vec<(Regex, Callback)>,
    persistent: bool,
    format: Format,
    root: ConfigRoot,
    path: PathBuf,
    has_default: bool,
    loaded: bool,
}

impl std::fmt::Debug for ConfigDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDict")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("persistent", &self.persistent)
            .field("loaded", &self.loaded)
            .field("values", self.checked.values())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl ConfigDict {
    /// Open a configuration registered in [`Registry::global`].
    pub fn open(options: ConfigOptions) -> Result<SharedConfig> {
        Self::open_in(Registry::global(), options)
    }

    /// Open a configuration and register it in `registry`.
    ///
    /// An existing live configuration with the same name only triggers a
    /// warning; the new one replaces it in the registry.
    pub fn open_in(registry: &Registry, options: ConfigOptions) -> Result<SharedConfig> {
        let name = check_name(&options.name)?;

        if let Some(existing) = registry.lookup(&name) {
            warn!(name = %name, "a configuration with this name is already open");
            if let Some(default) = &options.default {
                match existing.try_lock() {
                    Ok(existing) => {
                        if existing.checked.defaults() != default {
                            warn!(name = %name, "defaults differ from the already open configuration");
                        }
                    }
                    Err(_) => {
                        debug!(name = %name, "open configuration is locked, defaults not compared");
                    }
                }
            }
        }

        let has_default = options.default.is_some();
        let mut checked = CheckedDict::new(
            options.default.unwrap_or_default(),
            options.validator,
            options.docs,
        )?;
        if let Some(guard) = options.guard {
            checked.add_shared_guard(guard);
        }

        let root = config_root(options.config_root.as_deref());
        let mut config = Self::assemble(name, checked, options.persistent, options.format, root)?;
        config.has_default = has_default;
        if has_default && options.load {
            config.load()?;
        }

        let name = config.name.clone();
        let handle = Arc::new(Mutex::new(config));
        registry.register(&name, &handle);
        Ok(handle)
    }

    fn assemble(
        name: String,
        checked: CheckedDict,
        persistent: bool,
        format: Format,
        root: ConfigRoot,
    ) -> Result<Self> {
        let (base, config_name) = parse_name(&name);
        let path = storage_path(&root.path, base.as_deref(), &config_name, format);
        if persistent {
            ensure_parent(&path)?;
        }
        debug!(name = %name, path = %path.display(), source = %root.source, "config path resolved");
        Ok(Self {
            name,
            base,
            checked,
            callbacks: Vec::new(),
            persistent,
            format,
            root,
            path,
            has_default: false,
            loaded: false,
        })
    }

    /// Normalized name, e.g. `myproj:app`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The part of the name before the first separator, if any.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &ConfigRoot {
        &self.root
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Turn saving on writes on or off.
    pub fn set_persistent(&mut self, persistent: bool) -> Result<()> {
        if persistent && !self.persistent {
            ensure_parent(&self.path)?;
        }
        self.persistent = persistent;
        Ok(())
    }

    /// Whether a saved file has been merged in.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn as_checked(&self) -> &CheckedDict {
        &self.checked
    }

    /// Write `value` under `key`, then run callbacks and save.
    ///
    /// Returns `Ok(false)` without side effects if the value is unchanged.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        if !self.checked.set(key, value)? {
            return Ok(false);
        }
        self.after_write(&[key.to_string()])?;
        Ok(true)
    }

    /// Apply every value in `candidate` or none of them, then save once.
    pub fn update(&mut self, candidate: &BTreeMap<String, Value>) -> Result<()> {
        let changed: Vec<String> = candidate
            .iter()
            .filter(|(key, value)| !self.checked.get(key).is_some_and(|old| old.same_as(value)))
            .map(|(key, _)| key.clone())
            .collect();
        self.checked.update(candidate)?;
        if !changed.is_empty() {
            self.after_write(&changed)?;
        }
        Ok(())
    }

    /// Restore every default and rewrite the saved file.
    pub fn reset(&mut self) -> Result<()> {
        let changed: Vec<String> = self.checked.diff().into_keys().collect();
        self.checked.reset();
        for key in &changed {
            self.run_callbacks(key);
        }
        if self.persistent {
            self.save()?;
        }
        Ok(())
    }

    /// Add a key to the schema. See [`CheckedDict::add_key`].
    pub fn add_key(&mut self, key: &str, value: impl Into<Value>, spec: KeySpec) -> Result<()> {
        self.checked.add_key(key, value, spec)?;
        self.has_default = true;
        Ok(())
    }

    /// Call `func` after every change to a key matching `pattern`.
    ///
    /// `pattern` is a regular expression anchored at the start of the key;
    /// `None` matches every key.
    pub fn register_callback<F>(&mut self, func: F, pattern: Option<&str>) -> Result<()>
    where
        F: Fn(&ConfigDict, &str, &Value) + Send + Sync + 'static,
    {
        let pattern = pattern.unwrap_or(".*");
        let re = Regex::new(&format!("^(?:{pattern})")).map_err(|e| Error::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.callbacks.push((re, Arc::new(func)));
        Ok(())
    }

    fn run_callbacks(&self, key: &str) {
        let Some(value) = self.checked.get(key) else {
            return;
        };
        for (re, func) in &self.callbacks {
            if re.is_match(key) {
                func(self, key, value);
            }
        }
    }

    fn after_write(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.run_callbacks(key);
        }
        if self.persistent {
            self.save()?;
        }
        Ok(())
    }

    /// Merge the saved file into this configuration.
    pub fn load(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.load_from(&path)
    }

    /// Merge the file at `path` into this configuration.
    ///
    /// The parser is chosen by extension. Values are replaced directly:
    /// no guard, observer or callback runs and nothing is saved.
    pub fn load_from(&mut self, path: &Path) -> Result<()> {
        Format::from_path(path)?;
        let saved = if !path.exists() {
            if !self.has_default {
                return Err(Error::NotFound(path.to_path_buf()));
            }
            debug!(path = %path.display(), "no saved config, using defaults");
            BTreeMap::new()
        } else {
            match storage::read_saved(path) {
                Ok(saved) => saved,
                Err(err @ Error::Parse { .. }) if self.has_default => {
                    warn!(error = %err, "could not read saved config, using defaults");
                    BTreeMap::new()
                }
                Err(err) => return Err(err),
            }
        };

        let merged = merge_saved(&saved, self.checked.defaults());
        if !merged.stale.is_empty() {
            warn!(
                name = %self.name,
                keys = ?merged.stale,
                "saved config has keys not present in the defaults; they will be dropped"
            );
        }
        self.checked.update(&merged.values)?;
        self.loaded = true;
        debug!(name = %self.name, path = %path.display(), "config loaded");
        Ok(())
    }

    /// Write the whole configuration to its storage path.
    pub fn save(&self) -> Result<()> {
        storage::write(&self.checked, &self.path, self.format)
    }

    /// Write the whole configuration to `path`, format chosen by extension.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        storage::write(&self.checked, path, Format::from_path(path)?)
    }

    /// A standalone snapshot, not registered and not saved.
    pub fn copy(&self) -> CheckedDict {
        self.checked.clone()
    }

    /// A new configuration with this schema and these values under `name`,
    /// registered in [`Registry::global`].
    pub fn clone_named(&self, name: &str, persistent: bool) -> Result<SharedConfig> {
        self.clone_in(Registry::global(), name, persistent)
    }

    /// [`clone_named`](Self::clone_named) with an explicit registry.
    ///
    /// Fails with [`Error::NameTaken`] if a live configuration already uses
    /// `name`. Callbacks are not carried over.
    pub fn clone_in(&self, registry: &Registry, name: &str, persistent: bool) -> Result<SharedConfig> {
        let name = check_name(name)?;
        if registry.lookup(&name).is_some() {
            return Err(Error::NameTaken(name));
        }
        let mut clone = Self::assemble(
            name,
            self.checked.clone(),
            persistent,
            self.format,
            self.root.clone(),
        )?;
        clone.has_default = self.has_default;
        clone.loaded = self.loaded;
        if persistent {
            clone.save()?;
        }
        let name = clone.name.clone();
        let handle = Arc::new(Mutex::new(clone));
        registry.register(&name, &handle);
        Ok(handle)
    }

    /// Save, let the user edit the file, then load it back.
    pub fn edit(&mut self, editor: &dyn ExternalEditor) -> Result<()> {
        self.save()?;
        editor.open(&self.path)?;
        editor.wait(&self.path)?;
        self.load()
    }

    /// Reload if `path` is this configuration's storage path.
    ///
    /// Returns whether a reload happened.
    pub fn on_file_changed(&mut self, path: &Path) -> Result<bool> {
        if path != self.path {
            return Ok(false);
        }
        debug!(name = %self.name, "saved file changed, reloading");
        self.load()?;
        Ok(true)
    }
}

impl std::ops::Deref for ConfigDict {
    type Target = CheckedDict;

    fn deref(&self) -> &CheckedDict {
        &self.checked
    }
}

impl std::fmt::Display for ConfigDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Config: {}", self.name)?;
        write!(f, "{}", self.checked)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
        }
        _ => Ok(()),
    }
}
