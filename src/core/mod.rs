//! Core types: levels, fields, the logger contract, the facade and draining

pub mod context;
pub mod dispatcher;
pub mod drain;
pub mod error;
pub mod facade;
pub mod field;
pub mod global;
pub mod handle;
pub mod level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod record;
pub mod timestamp;

pub use context::{CancelHandle, Context};
pub use dispatcher::{Dispatcher, DispatcherConfig, Job, DEFAULT_SHUTDOWN_TIMEOUT};
pub use drain::{
    DispatchCounter, DrainBarrier, DrainConfig, InFlightGuard, DEFAULT_MAX_FLUSH_WAIT,
    DEFAULT_POLL_INTERVAL,
};
pub use error::{BackendFailure, FlushErrors, LoggerError, Result};
pub use facade::{LogFacade, LogFacadeBuilder};
pub use field::{Field, FieldSet, FieldValue, ResolvedFields};
pub use handle::Handle;
pub use level::{can_log, Level};
pub use logger::{Logger, SharedLogger};
pub use metrics::DispatchMetrics;
pub use output_format::OutputFormat;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use record::Record;
pub use timestamp::TimestampFormat;
