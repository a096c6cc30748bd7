//! configdict persistence: named configurations saved under the user's
//! config directory.
//!
//! This crate provides:
//! - [`ConfigDict`], a [`CheckedDict`] that saves itself on every write and
//!   merges its saved file with the current defaults on load
//! - Name normalization and storage path resolution
//! - A [`Registry`] of live configurations
//! - JSON and YAML storage
//! - Logging setup for embedding applications
//!
//! ```no_run
//! use cd_config::{ConfigDict, ConfigOptions};
//! use cd_core::{value::values, Validator, Value};
//!
//! # fn main() -> cd_core::Result<()> {
//! let handle = ConfigDict::open(
//!     ConfigOptions::new("myproj.window")
//!         .default(values([("size", Value::Int(100))]))
//!         .validator(Validator::new().with_range("size", 50.0, 150.0)),
//! )?;
//! let mut config = cd_config::lock(&handle);
//! config.set("size", 120)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod editor;
pub mod logging;
pub mod name;
pub mod registry;
pub mod resolve;
pub mod storage;

pub use cd_core::{CheckedDict, Error, Result, Value};
pub use config::{merge_saved, Callback, ConfigDict, ConfigOptions, Merged, SharedConfig};
pub use editor::ExternalEditor;
pub use name::{check_name, normalize_name, parse_name};
pub use registry::{lock, Registry};
pub use resolve::{config_path_from_name, config_root, ConfigRoot, RootSource};
pub use storage::Format;

/// Look up a live configuration in the global registry.
pub fn get_config(name: &str) -> Result<Option<SharedConfig>> {
    Registry::global().get(name)
}
