//! Logging configuration and initialization
//!
//! All components log through `tracing`. This module owns the one-time
//! subscriber setup: level and filter directives, text or JSON output, and
//! an optional daily rolling log file next to the console output.
//!
//! Use structured fields rather than formatted strings where a value is
//! worth filtering on:
//!
//! ```rust,ignore
//! info!(repository = %name, packages = count, "Found packages");
//! error!(error = ?err, artifact = %id, "Rejected artifact");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use artifacts_common::logging::{init_logging, LogConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = LogConfig::from_env()?;
//! init_logging(&config)?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
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
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,

    /// Extra directives, e.g. "sqlx=warn,aws_smithy_runtime=warn"
    pub filter_directives: Option<String>,

    /// When set, events are also written to a daily rolling file in this directory
    pub log_dir: Option<PathBuf>,

    pub log_file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            filter_directives: None,
            log_dir: None,
            log_file_prefix: "artifacts".to_string(),
        }
    }
}

impl LogConfig {
    /// Load configuration from environment variables
    ///
    /// - `ARTIFACTS_LOG_LEVEL`: trace, debug, info, warn, error
    /// - `ARTIFACTS_LOG_FORMAT`: text, json
    /// - `ARTIFACTS_LOG_FILTER`: additional filter directives
    /// - `ARTIFACTS_LOG_DIR`: directory for rolling log files
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Override fields of `self` with any logging variables present in the environment.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var("ARTIFACTS_LOG_LEVEL") {
            self.level = level.parse()?;
        }

        if let Ok(format) = std::env::var("ARTIFACTS_LOG_FORMAT") {
            self.format = format.parse()?;
        }

        if let Ok(filter) = std::env::var("ARTIFACTS_LOG_FILTER") {
            self.filter_directives = Some(filter);
        }

        if let Ok(dir) = std::env::var("ARTIFACTS_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }

        Ok(self)
    }

    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

/// Builder for LogConfig
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = Some(dir.into());
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
            filter = filter.add_directive(
                directive
                    .trim()
                    .parse()
                    .context("Failed to parse filter directive")?,
            );
        }
    }

    Ok(filter)
}

/// Initialize the global subscriber. Call once at startup.
///
/// Console output goes to stderr so stdout stays free for command output.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;

    let console = match config.format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let file = match config.log_dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir).context("Failed to create log directory")?;
            let appender = tracing_appender::rolling::daily(dir, &config.log_file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            // The writer flushes on guard drop; keep it for the process lifetime.
            std::mem::forget(guard);

            let layer = match config.format {
                LogFormat::Text => fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .boxed(),
                LogFormat::Json => fmt::layer().json().with_writer(non_blocking).boxed(),
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}
