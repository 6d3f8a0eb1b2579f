//! # Runtime Configuration Module
//!
//! Environment-driven knobs that affect how the dispatch core behaves at runtime.
//! Logging has its own configuration in [`crate::logging::LogConfig`].
//!
//! ## Environment Variables
//!
//! ### `SWITCHBOARD_DEBUG`
//!
//! When `true` (or `1`), the default exception handler includes the error's
//! message chain in rendered responses. Leave it off in production.
//!
//! Default: `false`
//!
//! ### `SWITCHBOARD_SLOW_MATCH_US`
//!
//! Route lookups slower than this many microseconds are logged at WARN.
//!
//! Default: `1000` (1 ms)
//!
//! ### `SWITCHBOARD_PATTERN_SIZE_LIMIT`
//!
//! Upper bound, in bytes, on the compiled matcher of a single route template.
//! Registration fails with `InvalidPattern` above it.
//!
//! Default: `10485760` (10 MiB)
//!
//! ## Usage
//!
//! ```rust
//! use switchboard::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("debug rendering: {}", config.debug);
//! ```

use std::env;
use std::time::Duration;

const DEFAULT_SLOW_MATCH_US: u64 = 1_000;
pub const DEFAULT_PATTERN_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Render error details in responses
    pub debug: bool,
    /// Threshold above which a route lookup is reported as slow
    pub slow_match_threshold: Duration,
    /// Compiled size cap for each route template's matcher
    pub pattern_size_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            slow_match_threshold: Duration::from_micros(DEFAULT_SLOW_MATCH_US),
            pattern_size_limit: DEFAULT_PATTERN_SIZE_LIMIT,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("SWITCHBOARD_DEBUG")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        let slow_match_us = lookup("SWITCHBOARD_SLOW_MATCH_US")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_SLOW_MATCH_US);
        let pattern_size_limit = lookup("SWITCHBOARD_PATTERN_SIZE_LIMIT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PATTERN_SIZE_LIMIT);

        RuntimeConfig {
            debug,
            slow_match_threshold: Duration::from_micros(slow_match_us),
            pattern_size_limit,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
