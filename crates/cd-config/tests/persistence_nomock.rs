//! No-mock persistence tests against a real temporary config root.
//!
//! Covers:
//! - Save / reopen / load round trips (JSON and YAML)
//! - Merge of saved files with evolved defaults
//! - Fallbacks for missing and unreadable files
//! - Registry behavior for duplicate and dropped configurations
//! - Editor hand-off and file change notifications
//! - Root resolution through `CONFIGDICT_CONFIG_DIR`

use cd_config::resolve::ENV_CONFIG_DIR;
use cd_config::{
    config_root, lock, ConfigDict, ConfigOptions, ExternalEditor, Format, Registry, RootSource,
    SharedConfig,
};
use cd_core::value::values;
use cd_core::{Choices, Error, GuardDecision, KeySpec, Validator, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    key: &'static str,
    saved: Option<String>,
}

impl EnvGuard {
    fn set(key: &'static str, value: &Path) -> Self {
        let saved = env::var(key).ok();
        env::set_var(key, value);
        Self { key, saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.saved {
            Some(val) => env::set_var(self.key, val),
            None => env::remove_var(self.key),
        }
    }
}

fn size_options(name: &str, root: &Path) -> ConfigOptions {
    ConfigOptions::new(name)
        .default(values([("size", Value::Int(100))]))
        .validator(Validator::new().with_range("size", 50.0, 150.0))
        .config_root(root)
}

fn open(registry: &Registry, options: ConfigOptions) -> SharedConfig {
    ConfigDict::open_in(registry, options).expect("open config")
}

#[test]
fn size_scenario_round_trip() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();

    let handle = open(&registry, size_options("myproj.window", dir.path()));
    {
        let mut config = lock(&handle);
        let err = config.set("size", 200).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(config.get("size"), Some(&Value::Int(100)));
        assert!(config.set("size", 120).unwrap());
    }
    drop(handle);

    let path = dir.path().join("myproj").join("window.json");
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "{\n  \"size\": 120\n}\n");

    let reopened = open(&registry, size_options("myproj/window", dir.path()));
    let config = lock(&reopened);
    assert!(config.is_loaded());
    assert_eq!(config.get("size"), Some(&Value::Int(120)));
}

#[test]
fn color_scenario() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(
        &registry,
        ConfigOptions::new("myproj.colors")
            .default(values([("color", Value::from("red"))]))
            .validator(Validator::new().with_choices("color", Choices::fixed(["red", "blue"])))
            .config_root(dir.path()),
    );
    let mut config = lock(&handle);
    assert!(config.set("color", "green").is_err());
    assert_eq!(
        config.get_choices("color").unwrap(),
        Some(vec![Value::from("red"), Value::from("blue")])
    );
}

#[test]
fn ghost_validator_key_fails_construction() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let err = ConfigDict::open_in(
        &registry,
        ConfigOptions::new("myproj.ghost")
            .default(values([("size", Value::Int(1))]))
            .validator(
                Validator::new().with_type("ghost", cd_core::TypeSpec::one(cd_core::ValueType::Int)),
            )
            .config_root(dir.path()),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    assert!(!registry.contains("myproj.ghost"));
}

#[test]
fn load_merges_with_evolved_defaults() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let path = dir.path().join("proj").join("merge.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"size": 80, "removed": true}"#).unwrap();

    let handle = open(
        &registry,
        ConfigOptions::new("proj.merge")
            .default(values([("size", Value::Int(100)), ("added", Value::from("x"))]))
            .config_root(dir.path()),
    );
    let config = lock(&handle);
    assert_eq!(
        config.values(),
        &values([("added", Value::from("x")), ("size", Value::Int(80))])
    );
    assert!(config.get("removed").is_none());
}

#[test]
fn invalid_saved_value_fails_load() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let path = dir.path().join("proj").join("bad.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"size": 500}"#).unwrap();

    let err = ConfigDict::open_in(&registry, size_options("proj.bad", dir.path())).unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m.contains("within range")));
}

#[test]
fn unreadable_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let path = dir.path().join("proj").join("broken.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();

    let handle = open(&registry, size_options("proj.broken", dir.path()));
    assert_eq!(lock(&handle).get("size"), Some(&Value::Int(100)));
}

#[test]
fn load_without_defaults() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(
        &registry,
        ConfigOptions::new("proj.empty").config_root(dir.path()),
    );
    let mut config = lock(&handle);
    assert!(matches!(config.load(), Err(Error::NotFound(_))));

    fs::write(config.path(), "[oops").unwrap();
    assert!(matches!(config.load(), Err(Error::Parse { .. })));
}

#[test]
fn incremental_schema_then_load() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(
        &registry,
        ConfigOptions::new("proj.steps")
            .load(false)
            .config_root(dir.path()),
    );
    let mut config = lock(&handle);
    config
        .add_key("keyA", 10, KeySpec::new().doc("documentation of keyA"))
        .unwrap();
    config
        .add_key("keyB", 0.5, KeySpec::new().range(0.0, 1.0))
        .unwrap();
    config.load().unwrap();
    assert_eq!(config.get("keyB"), Some(&Value::Float(0.5)));
    assert_eq!(config.get_doc("keyA"), Some("documentation of keyA"));
}

#[test]
fn duplicate_names_warn_and_replace() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let first = open(&registry, size_options("proj.dup", dir.path()));
    let second = open(
        &registry,
        ConfigOptions::new("proj:dup")
            .default(values([("other", Value::Bool(true))]))
            .config_root(dir.path()),
    );
    let current = registry.get("proj/dup").unwrap().unwrap();
    assert!(Arc::ptr_eq(&current, &second));
    assert!(!Arc::ptr_eq(&current, &first));
}

#[test]
fn clone_named_requires_free_name() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(&registry, size_options("proj.orig", dir.path()));
    let _other = open(&registry, size_options("proj.taken", dir.path()));

    let config = {
        let mut config = lock(&handle);
        config.set("size", 90).unwrap();
        config
    };
    let err = config.clone_in(&registry, "proj.taken", true).unwrap_err();
    assert!(matches!(err, Error::NameTaken(ref n) if n == "proj:taken"));

    let clone = config.clone_in(&registry, "proj.copy", true).unwrap();
    drop(config);
    let clone = lock(&clone);
    assert_eq!(clone.get("size"), Some(&Value::Int(90)));
    assert!(dir.path().join("proj").join("copy.json").exists());
    assert!(registry.contains("proj.copy"));
}

#[test]
fn copy_is_detached() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(&registry, size_options("proj.snap", dir.path()));
    let mut snapshot = lock(&handle).copy();
    snapshot.set("size", 60).unwrap();
    let config = lock(&handle);
    assert_eq!(config.get("size"), Some(&Value::Int(100)));
    assert!(!config.path().exists());
}

#[test]
fn guard_veto_keeps_file_untouched() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(
        &registry,
        size_options("proj.guarded", dir.path()).guard(
            |_: &cd_core::CheckedDict, _: &str, _: Option<&Value>, new: &Value| {
                if new.as_i64() == Some(77) {
                    GuardDecision::Veto("unlucky".into())
                } else {
                    GuardDecision::Accept
                }
            },
        ),
    );
    let mut config = lock(&handle);
    assert!(matches!(
        config.set("size", 77),
        Err(Error::Rejected { ref reason, .. }) if reason == "unlucky"
    ));
    assert!(!config.path().exists());
}

#[test]
fn yaml_round_trip() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let options = || {
        size_options("proj.yamlcfg", dir.path())
            .format(Format::Yaml)
            .docs(BTreeMap::from([("size".to_string(), "Window size".to_string())]))
    };
    let handle = open(&registry, options());
    lock(&handle).set("size", 130).unwrap();
    drop(handle);

    let path = dir.path().join("proj").join("yamlcfg.yaml");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("# Window size"));

    let handle = open(&registry, options());
    assert_eq!(lock(&handle).get("size"), Some(&Value::Int(130)));
}

#[test]
fn save_to_and_load_from_pick_format_by_extension() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(&registry, size_options("proj.export", dir.path()));
    let mut config = lock(&handle);
    config.set("size", 140).unwrap();

    let exported = dir.path().join("export.yml");
    config.save_to(&exported).unwrap();
    config.reset().unwrap();
    config.load_from(&exported).unwrap();
    assert_eq!(config.get("size"), Some(&Value::Int(140)));

    let err = config.save_to(&dir.path().join("export.ini")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { .. }));
}

struct ScriptedEditor {
    new_contents: &'static str,
    calls: RefCell<Vec<String>>,
}

impl ExternalEditor for ScriptedEditor {
    fn open(&self, path: &Path) -> cd_core::Result<()> {
        self.calls.borrow_mut().push("open".into());
        fs::write(path, self.new_contents).map_err(|e| Error::io(path, e))
    }

    fn wait(&self, _path: &Path) -> cd_core::Result<()> {
        self.calls.borrow_mut().push("wait".into());
        Ok(())
    }
}

#[test]
fn edit_reloads_after_editor_finishes() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let handle = open(&registry, size_options("proj.edited", dir.path()));
    let editor = ScriptedEditor {
        new_contents: r#"{"size": 55}"#,
        calls: RefCell::new(Vec::new()),
    };
    let mut config = lock(&handle);
    config.edit(&editor).unwrap();
    assert_eq!(config.get("size"), Some(&Value::Int(55)));
    assert_eq!(*editor.calls.borrow(), vec!["open", "wait"]);
}

#[test]
fn file_change_notification_reloads_matching_config() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let watched = open(&registry, size_options("proj.watched", dir.path()));
    let _other = open(&registry, size_options("proj.other", dir.path()));

    let path: PathBuf = lock(&watched).path().to_path_buf();
    fs::write(&path, r#"{"size": 66}"#).unwrap();

    let reloaded = registry.notify_file_changed(&path).unwrap();
    assert_eq!(reloaded, vec!["proj:watched".to_string()]);
    assert_eq!(lock(&watched).get("size"), Some(&Value::Int(66)));
}

#[test]
fn env_var_sets_config_root() {
    let _lock = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let _guard = EnvGuard::set(ENV_CONFIG_DIR, dir.path());

    let root = config_root(None);
    assert_eq!(root.source, RootSource::Environment);
    assert_eq!(root.path, dir.path());

    let registry = Registry::new();
    let handle = open(
        &registry,
        ConfigOptions::new("envproj.app").default(values([("on", Value::Bool(true))])),
    );
    lock(&handle).set("on", false).unwrap();
    assert!(dir.path().join("envproj").join("app.json").exists());
}

#[test]
fn non_finite_float_never_reaches_disk() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::new();
    let options = || {
        ConfigOptions::new("proj.ratio")
            .default(values([("ratio", Value::Float(0.5))]))
            .config_root(dir.path())
    };
    let handle = open(&registry, options());
    {
        let mut config = lock(&handle);
        config.set("ratio", 0.25).unwrap();
        for bad in [f64::NAN, f64::INFINITY] {
            assert!(matches!(config.set("ratio", bad), Err(Error::Validation(_))));
        }
    }
    drop(handle);

    let path = dir.path().join("proj").join("ratio.json");
    assert!(!fs::read_to_string(&path).unwrap().contains("null"));

    let reopened = open(&registry, options());
    assert_eq!(lock(&reopened).get("ratio"), Some(&Value::Float(0.25)));
}
