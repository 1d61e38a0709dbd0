//! # Fanout Logger
//!
//! A structured logging facade that fans every event out to a set of
//! interchangeable backends.
//!
//! ## Features
//!
//! - **Level Gate**: each backend applies its own threshold; `Disabled` drops everything
//! - **Structured Fields**: typed key/value pairs with last-writer-wins merging
//! - **Derivation**: `named` and `with` return new loggers and never mutate the receiver
//! - **Context Attachment**: request-scoped loggers carried in a [`Context`]
//! - **Drain Barrier**: asynchronous backends flush by waiting for their in-flight
//!   counter to reach zero, honouring cancellation and a maximum wait
//! - **Fault Isolation**: a panicking or failing backend never affects its siblings
//!
//! ## Backends
//!
//! - [`backends::ConsoleLogger`]: synchronous text, JSON or logfmt lines
//! - [`backends::FileLogger`]: JSON lines appended to a file
//! - [`backends::IndexLogger`]: asynchronous delivery of JSON documents to a search index
//! - [`backends::TrackerLogger`]: error events with a bounded breadcrumb trail
//! - [`backends::NoopLogger`]: discards everything
//!
//! ## Example
//!
//! ```
//! use fanout_logger::prelude::*;
//! use fanout_logger::backends::ConsoleLogger;
//! use std::sync::Arc;
//!
//! let facade = LogFacade::builder()
//!     .backend(Arc::new(ConsoleLogger::builder().threshold(Level::Info).build()))
//!     .backend(Arc::new(NoopLogger))
//!     .build();
//!
//! let ctx = Context::background();
//! let api = facade.named("api").with(&[Field::new("version", "1.4.0")]);
//! api.info(&ctx, "listening", &[Field::new("port", 8080)]);
//! api.flush(&ctx)?;
//! # Ok::<(), fanout_logger::LoggerError>(())
//! ```

pub mod backends;
pub mod config;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::backends::NoopLogger;
    pub use crate::core::{
        can_log, global, CancelHandle, Context, DrainBarrier, Field, FieldValue, Level,
        LogFacade, LogFacadeBuilder, Logger, LoggerError, OutputFormat, Result, SharedLogger,
        TimestampFormat,
    };
}

pub use backends::{ConsoleLogger, FileLogger, IndexLogger, NoopLogger, TrackerLogger};
pub use config::FacadeConfig;
pub use crate::core::{
    can_log, global, BackendFailure, CancelHandle, Context, DispatchCounter, DispatchMetrics,
    Dispatcher, DispatcherConfig, DrainBarrier, DrainConfig, Field, FieldValue, FlushErrors,
    Handle, InFlightGuard, Level, LogFacade, LogFacadeBuilder, Logger, LoggerError,
    OutputFormat, OverflowCallback, OverflowPolicy, Result, SharedLogger, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
