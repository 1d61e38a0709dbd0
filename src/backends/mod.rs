//! Backend implementations

pub mod console;
pub mod file;
pub mod index;
pub mod noop;
pub mod tracker;

pub use console::{ConsoleConfig, ConsoleLogger, ConsoleLoggerBuilder, ConsoleTarget};
pub use file::FileLogger;
pub use index::{
    IndexClient, IndexEvent, IndexLogger, IndexLoggerBuilder, IndexNameBuilder, TcpIndexClient,
    DEFAULT_INDEX_NAME,
};
pub use noop::NoopLogger;
pub use tracker::{
    Breadcrumb, EventTransport, TrackerEvent, TrackerLogger, TrackerLoggerBuilder, WriterTransport,
};

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of event timestamps, replaceable in tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
