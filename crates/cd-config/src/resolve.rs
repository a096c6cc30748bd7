//! Config root resolution and storage path derivation.
//!
//! Resolution order: explicit root → `CONFIGDICT_CONFIG_DIR` → platform
//! config directory → temporary directory.

use std::path::{Path, PathBuf};

use cd_core::Result;
use tracing::warn;

use crate::name::{check_name, parse_name};
use crate::storage::Format;

/// Environment variable overriding the platform config directory.
pub const ENV_CONFIG_DIR: &str = "CONFIGDICT_CONFIG_DIR";

/// Where the config root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    /// Passed explicitly by the caller.
    Explicit,
    /// Set via environment variable.
    Environment,
    /// The platform's user config directory.
    Platform,
    /// No config directory could be determined.
    Fallback,
}

impl std::fmt::Display for RootSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootSource::Explicit => write!(f, "explicit"),
            RootSource::Environment => write!(f, "environment variable"),
            RootSource::Platform => write!(f, "platform config dir"),
            RootSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// A resolved config root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    pub path: PathBuf,
    pub source: RootSource,
}

/// Resolve the directory all configurations are stored under.
pub fn config_root(explicit: Option<&Path>) -> ConfigRoot {
    if let Some(path) = explicit {
        return ConfigRoot {
            path: path.to_path_buf(),
            source: RootSource::Explicit,
        };
    }

    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        if !dir.is_empty() {
            return ConfigRoot {
                path: PathBuf::from(dir),
                source: RootSource::Environment,
            };
        }
    }

    if let Some(dir) = dirs::config_dir() {
        return ConfigRoot {
            path: dir,
            source: RootSource::Platform,
        };
    }

    let path = std::env::temp_dir().join("configdict");
    warn!(path = %path.display(), "no user config directory found, using fallback");
    ConfigRoot {
        path,
        source: RootSource::Fallback,
    }
}

/// `{root}/{base}/{config_name}.{ext}`, or `{root}/{config_name}.{ext}`
/// without a base.
pub fn storage_path(root: &Path, base: Option<&str>, config_name: &str, format: Format) -> PathBuf {
    let dir = match base {
        Some(base) => root.join(base),
        None => root.to_path_buf(),
    };
    dir.join(format!("{config_name}.{}", format.extension()))
}

/// The path a configuration called `name` is saved to.
pub fn config_path_from_name(name: &str, format: Format, root: Option<&Path>) -> Result<PathBuf> {
    let name = check_name(name)?;
    let (base, config_name) = parse_name(&name);
    let root = config_root(root);
    Ok(storage_path(&root.path, base.as_deref(), &config_name, format))
}
