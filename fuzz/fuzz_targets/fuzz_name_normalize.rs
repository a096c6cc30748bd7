//! Fuzz target for configuration name normalization.
//!
//! Normalizing is idempotent and a valid name always splits into components
//! without separators.

#![no_main]

use cd_config::name::{check_name, normalize_name, parse_name};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let once = normalize_name(s);
        assert_eq!(normalize_name(&once), once);
        if let Ok(name) = check_name(s) {
            let (base, config_name) = parse_name(&name);
            assert!(!config_name.contains(':'));
            assert!(base.map_or(true, |b| !b.contains(':')));
        }
    }
});
