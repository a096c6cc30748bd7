//! Reading and writing saved configurations.
//!
//! JSON is written pretty-printed with sorted keys. YAML is written with a
//! comment block per key and is mainly meant for editing by hand.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cd_core::{CheckedDict, Error, Result, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// On-disk format of a saved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    /// The format implied by a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(Error::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parse saved text into a key/value map.
pub fn parse_saved(text: &str, format: Format) -> std::result::Result<BTreeMap<String, Value>, String> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
    }
}

/// Read a saved configuration, choosing the parser from the extension.
pub fn read_saved(path: &Path) -> Result<BTreeMap<String, Value>> {
    let format = Format::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_saved(&text, format).map_err(|message| Error::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Render the full contents of `dict` in `format`.
pub fn render(dict: &CheckedDict, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let mut text = serde_json::to_string_pretty(dict.values())?;
            text.push('\n');
            Ok(text)
        }
        Format::Yaml => dict.as_yaml(),
    }
}

/// Write the full contents of `dict` to `path` in `format`.
pub fn write(dict: &CheckedDict, path: &Path, format: Format) -> Result<()> {
    debug!(path = %path.display(), %format, "saving config");
    let text = render(dict, format)?;
    fs::write(path, text).map_err(|e| Error::io(path, e))
}
