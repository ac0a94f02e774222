//! Process-wide tracing setup. Everything goes to stderr: stdout carries the
//! JSON-lines responses and must stay clean.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_LEVEL: &str = "REFLISTD_LOG_LEVEL";
pub const ENV_FORMAT: &str = "REFLISTD_LOG_FORMAT";
pub const ENV_FILTER: &str = "REFLISTD_LOG_FILTER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("invalid log level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, comma separated (e.g. `rusqlite=debug`).
    pub filter_directives: Option<String>,
}

impl LogConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(level) = lookup(ENV_LEVEL) {
            config.level = level.parse()?;
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            config.format = format.parse()?;
        }
        if let Some(filter) = lookup(ENV_FILTER) {
            if !filter.trim().is_empty() {
                config.filter_directives = Some(filter);
            }
        }
        Ok(config)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter =
            EnvFilter::from_default_env().add_directive(self.level.to_tracing_level().into());
        if let Some(ref directives) = self.filter_directives {
            for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
                filter = filter.add_directive(
                    directive
                        .trim()
                        .parse()
                        .context("failed to parse filter directive")?,
                );
            }
        }
        Ok(filter)
    }
}

pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}

/// Reads the environment and installs the subscriber. A bad setting never
/// stops the sidecar: it falls back to the defaults and says so.
pub fn init_from_env() {
    let problem = match LogConfig::from_env() {
        Ok(config) => init_logging(&config).err(),
        Err(e) => Some(e),
    };
    if let Some(e) = problem {
        if init_logging(&LogConfig::default()).is_ok() {
            tracing::warn!(error = %e, "invalid logging configuration, using defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = LogConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn reads_level_format_and_filter() {
        let config = LogConfig::from_lookup(lookup(&[
            (ENV_LEVEL, "DEBUG"),
            (ENV_FORMAT, "json"),
            (ENV_FILTER, "rusqlite=info"),
        ]))
        .expect("config");
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter_directives.as_deref(), Some("rusqlite=info"));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(LogConfig::from_lookup(lookup(&[(ENV_LEVEL, "loud")])).is_err());
        assert!(LogConfig::from_lookup(lookup(&[(ENV_FORMAT, "xml")])).is_err());
        assert_eq!("warning".parse::<LogLevel>().expect("level"), LogLevel::Warn);
    }

    #[test]
    fn blank_filter_is_ignored() {
        let config = LogConfig::from_lookup(lookup(&[(ENV_FILTER, "  ")])).expect("config");
        assert!(config.filter_directives.is_none());
    }
}
