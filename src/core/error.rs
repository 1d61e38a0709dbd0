//! Error types for the logger system

use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unknown level name
    #[error("unknown log level: {0}")]
    InvalidLevel(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Dispatch queue full with buffer details
    #[error("Dispatch queue full: {current}/{max} jobs buffered")]
    QueueFull { current: usize, max: usize },

    /// Dispatcher workers are gone
    #[error("Dispatcher is shut down")]
    DispatcherClosed,

    /// Flush context was cancelled while deliveries were pending
    #[error("not all logs were flushed: {remaining} remaining")]
    FlushCancelled { remaining: usize },

    /// Flush exceeded its maximum wait
    #[error("timed out waiting for logs to be flushed: {remaining} remaining")]
    FlushTimedOut { remaining: usize },

    /// Error tracker transport did not drain in time
    #[error("failed to flush error tracker within {timeout:?}")]
    TrackerFlush { timeout: Duration },

    /// One or more backends failed to flush
    #[error("{0}")]
    Flush(#[source] FlushErrors),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Number of deliveries still pending when a flush gave up, if this is a
    /// drain error.
    pub fn remaining(&self) -> Option<usize> {
        match self {
            LoggerError::FlushCancelled { remaining } | LoggerError::FlushTimedOut { remaining } => {
                Some(*remaining)
            }
            _ => None,
        }
    }
}

/// One backend's failure inside an aggregated flush error
#[derive(Debug)]
pub struct BackendFailure {
    /// Registration position of the backend in its facade
    pub position: usize,
    /// Type tag of the failing backend
    pub type_tag: String,
    pub error: LoggerError,
}

/// Flush failures of several backends, kept in registration order
///
/// Each failure stays individually reachable so callers can tell which
/// backend failed and why.
#[derive(Debug, Default)]
pub struct FlushErrors {
    failures: Vec<BackendFailure>,
}

impl FlushErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, position: usize, type_tag: impl Into<String>, error: LoggerError) {
        self.failures.push(BackendFailure {
            position,
            type_tag: type_tag.into(),
            error,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendFailure> {
        self.failures.iter()
    }

    /// First error reported by a backend with the given type tag
    pub fn get(&self, type_tag: &str) -> Option<&LoggerError> {
        self.failures
            .iter()
            .find(|failure| failure.type_tag == type_tag)
            .map(|failure| &failure.error)
    }

    pub fn into_failures(self) -> Vec<BackendFailure> {
        self.failures
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate as an error
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(LoggerError::Flush(self))
        }
    }
}

impl fmt::Display for FlushErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.failures.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{} (#{}): {}", failure.type_tag, failure.position, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FlushErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| &failure.error as &(dyn std::error::Error + 'static))
    }
}
