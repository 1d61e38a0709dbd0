//! Serializable configuration for a facade and its backends
//!
//! Durations are given in milliseconds so the same file works from JSON or
//! any other serde format.
//!
//! ```
//! use fanout_logger::config::FacadeConfig;
//!
//! let config = FacadeConfig::from_json(r#"{
//!     "console": { "threshold": "info", "format": "logfmt" },
//!     "index": { "index": "app-logs", "drain": { "poll_interval_ms": 50 } },
//!     "tracker": { "event_threshold": "warn" }
//! }"#)?;
//!
//! let facade = config.build()?;
//! assert_eq!(facade.backend_tags(), vec!["console"]);
//! # Ok::<(), fanout_logger::LoggerError>(())
//! ```

use crate::backends::{
    ConsoleConfig, ConsoleLogger, FileLogger, IndexLoggerBuilder, TrackerLoggerBuilder,
    DEFAULT_INDEX_NAME,
};
use crate::backends::tracker::{DEFAULT_MAX_BREADCRUMBS, DEFAULT_TRACKER_FLUSH_TIMEOUT};
use crate::core::{
    DispatcherConfig, DrainConfig, Level, LogFacade, LoggerError, OutputFormat, Result,
    TimestampFormat,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Console backend; `null` disables it
    pub console: Option<ConsoleConfig>,
    /// File backend; absent by default
    pub file: Option<FileConfig>,
    /// Settings applied to index loggers built with [`IndexConfig::apply`]
    pub index: IndexConfig,
    /// Settings applied to tracker loggers built with [`TrackerConfig::apply`]
    pub tracker: TrackerConfig,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            console: Some(ConsoleConfig::default()),
            file: None,
            index: IndexConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl FacadeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(file) = &self.file {
            file.validate()?;
        }
        self.index.validate()?;
        self.tracker.validate()
    }

    /// Facade with the console and file backends this config enables
    ///
    /// Index and tracker backends need a client or transport; build them with
    /// [`IndexConfig::apply`] and [`TrackerConfig::apply`] and add them to the
    /// returned facade.
    pub fn build(&self) -> Result<LogFacade> {
        self.validate()?;
        let facade = LogFacade::new();

        if let Some(console) = &self.console {
            facade.add(Arc::new(ConsoleLogger::from_config(console)));
        }
        if let Some(file) = &self.file {
            facade.add(Arc::new(file.open()?));
        }
        Ok(facade)
    }
}

/// File backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub path: PathBuf,
    pub threshold: Level,
    pub format: OutputFormat,
    pub timestamp_format: TimestampFormat,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            threshold: Level::Debug,
            format: OutputFormat::Json,
            timestamp_format: TimestampFormat::Iso8601,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(LoggerError::config("FileConfig", "path must not be empty"));
        }
        Ok(())
    }

    pub fn open(&self) -> Result<FileLogger> {
        FileLogger::open_with(&self.path, |builder| {
            builder
                .threshold(self.threshold)
                .format(self.format)
                .timestamp_format(self.timestamp_format.clone())
        })
    }
}

/// Index backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub threshold: Level,
    /// Constant target index
    pub index: String,
    pub drain: DrainConfig,
    pub dispatcher: DispatcherConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            threshold: Level::Debug,
            index: DEFAULT_INDEX_NAME.to_string(),
            drain: DrainConfig::default(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            return Err(LoggerError::config("IndexConfig", "index must not be empty"));
        }
        self.drain.validate()?;
        self.dispatcher.validate()
    }

    pub fn apply(&self, builder: IndexLoggerBuilder) -> IndexLoggerBuilder {
        builder
            .threshold(self.threshold)
            .index(self.index.clone())
            .barrier(self.drain.barrier())
            .dispatcher_config(self.dispatcher.clone())
    }
}

/// Error-tracker backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub event_threshold: Level,
    pub breadcrumb_threshold: Level,
    pub max_breadcrumbs: usize,
    pub flush_timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            event_threshold: Level::Error,
            breadcrumb_threshold: Level::Info,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            flush_timeout_ms: DEFAULT_TRACKER_FLUSH_TIMEOUT.as_millis() as u64,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.flush_timeout_ms == 0 {
            return Err(LoggerError::config(
                "TrackerConfig",
                "flush_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn apply(&self, builder: TrackerLoggerBuilder) -> TrackerLoggerBuilder {
        builder
            .event_threshold(self.event_threshold)
            .breadcrumb_threshold(self.breadcrumb_threshold)
            .max_breadcrumbs(self.max_breadcrumbs)
            .flush_timeout(Duration::from_millis(self.flush_timeout_ms))
    }
}
