//! Fuzz target for saved JSON configuration files.
//!
//! Parsing never panics and merging always yields one value per default.

#![no_main]

use cd_config::merge_saved;
use cd_config::storage::{parse_saved, Format};
use cd_core::value::values;
use cd_core::Value;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(saved) = parse_saved(s, Format::Json) {
            let defaults = values([("size", Value::Int(100)), ("color", Value::from("red"))]);
            let merged = merge_saved(&saved, &defaults);
            assert_eq!(merged.values.len(), defaults.len());
        }
    }
});
