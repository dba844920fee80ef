//! Tracing subscriber setup for the binary

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Level used when `RUST_LOG` is unset; `verbose` raises it to at least debug
#[must_use]
pub fn effective_level(config: &LoggingConfig, verbose: bool) -> &str {
    match (verbose, config.level.as_str()) {
        (true, "trace") => "trace",
        (true, _) => "debug",
        (false, level) => level,
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the config level.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = effective_level(config, verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lifetrack={level},warn")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            ..LoggingConfig::default()
        }
    }

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(&logging("info"), false), "info");
        assert_eq!(effective_level(&logging("warn"), true), "debug");
        assert_eq!(effective_level(&logging("trace"), true), "trace");
    }
}
