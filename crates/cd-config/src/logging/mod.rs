//! Logging setup for applications embedding configdict.
//!
//! The library itself only emits `tracing` events; nothing is printed unless
//! a subscriber is installed, e.g. with [`init_logging`].
//!
//! ```no_run
//! use cd_config::logging::{init_logging, LogConfig, LogLevel};
//!
//! init_logging(&LogConfig::from_env().with_level(LogLevel::Debug));
//! ```

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is kept.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = build_filter(config);

    match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()
                    .is_ok()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.without_time())
                    .try_init()
                    .is_ok()
            }
        }
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok(),
    }
}

/// Filter for the configdict crates, or a global level filter if the
/// directives do not parse.
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_new(config.directives()).unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from(config.level).into())
    })
}

/// [`init_logging`] with [`LogConfig::from_env`].
pub fn init_default_logging() -> bool {
    init_logging(&LogConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_follows_level() {
        let filter = build_filter(&LogConfig::default().with_level(LogLevel::Debug));
        let shown = filter.to_string();
        assert!(shown.contains("cd_config=debug"));
        assert!(shown.contains("cd_core=debug"));
    }

    #[test]
    fn test_second_init_is_harmless() {
        let config = LogConfig::default().with_timestamps(false);
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
