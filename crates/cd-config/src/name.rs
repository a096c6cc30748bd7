//! Configuration names.
//!
//! `project:app`, `project/app` and `project.app` all name the same
//! configuration. The canonical form uses `:` and never repeats a separator.

use std::sync::OnceLock;

use cd_core::{Error, Result};
use regex::Regex;

/// Canonical separator between name components.
pub const SEPARATOR: char = ':';

fn valid_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._:]+$").expect("static name pattern"))
}

/// Map every `/` and `.` to `:` and collapse runs of separators.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        let ch = if ch == '/' || ch == '.' { SEPARATOR } else { ch };
        if ch == SEPARATOR && out.ends_with(SEPARATOR) {
            continue;
        }
        out.push(ch);
    }
    out
}

pub fn is_valid_name(name: &str) -> bool {
    valid_name_re().is_match(name)
}

/// Normalize `name` and check it can identify a configuration.
pub fn check_name(name: &str) -> Result<String> {
    let normalized = normalize_name(name);
    if !is_valid_name(&normalized) || normalized.ends_with(SEPARATOR) {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(normalized)
}

/// Split a normalized name into `(base, config_name)`.
///
/// The base is everything before the first separator (`None` when there is
/// no separator or nothing before it); the remaining components are joined
/// with `.` to form the file stem.
pub fn parse_name(name: &str) -> (Option<String>, String) {
    match name.split_once(SEPARATOR) {
        None => (None, name.to_string()),
        Some((base, rest)) => {
            let config_name = rest.split(SEPARATOR).collect::<Vec<_>>().join(".");
            let base = (!base.is_empty()).then(|| base.to_string());
            (base, config_name)
        }
    }
}
