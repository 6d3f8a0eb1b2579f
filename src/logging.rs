//! Structured logging initialization
//!
//! Every component in this crate logs through `tracing` macros with structured
//! fields. Hosting applications call [`init_logging_with_config`] once at startup
//! to install a subscriber; libraries and tests may skip it entirely.
//!
//! ## Environment
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `SWITCHBOARD_LOG_LEVEL` | `info` | base level when `RUST_LOG` is unset |
//! | `SWITCHBOARD_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `SWITCHBOARD_LOG_ASYNC` | `false` | write through a background thread |
//! | `SWITCHBOARD_LOG_TARGET_FILTER` | unset | extra directives, e.g. `switchboard::router=debug` |
//! | `SWITCHBOARD_LOG_INCLUDE_LOCATION` | `false` | add `file:line` to every event |

use std::env;

use anyhow::{Context, Result};
use tracing::{warn, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Anything other than `pretty` selects JSON
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error; unknown values mean info
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a non-blocking background writer
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

fn flag(value: Option<String>) -> Option<bool> {
    value.and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing or unparseable values keep
    /// their defaults
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("SWITCHBOARD_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("SWITCHBOARD_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.format),
            async_logging: flag(lookup("SWITCHBOARD_LOG_ASYNC")).unwrap_or(defaults.async_logging),
            target_filter: lookup("SWITCHBOARD_LOG_TARGET_FILTER").filter(|f| !f.trim().is_empty()),
            include_location: flag(lookup("SWITCHBOARD_LOG_INCLUDE_LOCATION"))
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, human-readable configuration for local development
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            async_logging: true,
            ..Self::default()
        }
    }

    fn level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }
}

/// `RUST_LOG` wins over the configured level; target directives are added on
/// top. Directives that fail to parse are returned so they can be logged once a
/// subscriber exists.
fn build_filter(config: &LogConfig) -> (EnvFilter, Vec<String>) {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str().to_ascii_lowercase()));
    let mut rejected = Vec::new();

    let directives = config.target_filter.as_deref().unwrap_or_default();
    for raw in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        match raw.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => rejected.push(raw.to_string()),
        }
    }
    (filter, rejected)
}

type Base = Layered<EnvFilter, Registry>;

fn fmt_layer<S, W>(config: &LogConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer);
    match config.format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Initialize logging from the environment, overriding the level
///
/// # Example
///
/// ```no_run
/// use switchboard::logging;
///
/// let _guard = logging::init_logging("info").expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: &str) -> Result<Option<WorkerGuard>> {
    let config = LogConfig {
        log_level: log_level.to_string(),
        ..LogConfig::from_env()
    };
    init_logging_with_config(&config)
}

/// Install the global `tracing` subscriber
///
/// With `async_logging` the returned guard owns the background writer; keep it
/// alive for the life of the process or buffered events are lost. Fails if a
/// global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (filter, rejected) = build_filter(config);

    let (layer, guard): (Box<dyn Layer<Base> + Send + Sync>, _) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (fmt_layer(config, writer), Some(guard))
    } else {
        (fmt_layer(config, std::io::stdout), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("Failed to install the global tracing subscriber")?;

    for directive in rejected {
        warn!(directive = %directive, "Ignoring invalid log filter directive");
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(" PRETTY "), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }

    #[test]
    fn test_from_lookup() {
        let config = LogConfig::from_lookup(lookup(&[
            ("SWITCHBOARD_LOG_LEVEL", "warn"),
            ("SWITCHBOARD_LOG_FORMAT", "pretty"),
            ("SWITCHBOARD_LOG_ASYNC", "yes"),
            ("SWITCHBOARD_LOG_INCLUDE_LOCATION", "maybe"),
            ("SWITCHBOARD_LOG_TARGET_FILTER", "  "),
        ]));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.async_logging);
        assert!(!config.include_location);
        assert_eq!(config.target_filter, None);

        assert_eq!(LogConfig::from_lookup(lookup(&[])), LogConfig::default());
    }

    #[test]
    fn test_unknown_level_means_info() {
        let mut config = LogConfig::default_prod();
        config.log_level = "loud".to_string();
        assert_eq!(config.level(), Level::INFO);
        config.log_level = "DEBUG".to_string();
        assert_eq!(config.level(), Level::DEBUG);
    }

    #[test]
    fn test_dev_and_prod_presets() {
        let dev = LogConfig::default_dev();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.include_location);
        assert!(!dev.async_logging);

        let prod = LogConfig::default_prod();
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.async_logging);
    }

    #[test]
    fn test_bad_directives_are_collected() {
        let config = LogConfig {
            target_filter: Some("switchboard=debug, ,other=notalevel".to_string()),
            ..LogConfig::default()
        };
        let (filter, rejected) = build_filter(&config);
        assert!(filter.to_string().contains("switchboard=debug"));
        assert_eq!(rejected, vec!["other=notalevel"]);
    }
}
