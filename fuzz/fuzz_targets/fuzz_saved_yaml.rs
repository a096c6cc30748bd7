//! Fuzz target for saved YAML configuration files.

#![no_main]

use cd_config::storage::{parse_saved, Format};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_saved(s, Format::Yaml);
    }
});
