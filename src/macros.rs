//! Logging macros with `format!`-style messages and inline fields
//!
//! Each macro takes a logger (anything with a `log(ctx, level, message,
//! fields)` method), a `&Context`, a format string with its arguments and,
//! after a `;`, optional `key => value` fields.
//!
//! # Examples
//!
//! ```
//! use fanout_logger::prelude::*;
//! use fanout_logger::{info, error};
//!
//! let logger = LogFacade::builder().backend(std::sync::Arc::new(NoopLogger)).build();
//! let ctx = Context::background();
//!
//! info!(logger, &ctx, "Server started");
//!
//! let port = 8080;
//! info!(logger, &ctx, "Listening on port {}", port);
//!
//! error!(logger, &ctx, "Request failed after {} retries", 3; "status" => 503, "path" => "/api");
//! ```

/// Log at an explicit level.
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = NoopLogger;
/// # let ctx = Context::background();
/// use fanout_logger::log;
/// log!(logger, &ctx, Level::Info, "Simple message");
/// log!(logger, &ctx, Level::Error, "Error code: {}", 500; "retry" => false);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $ctx:expr, $level:expr, $fmt:literal $(, $arg:expr)* ; $($key:expr => $value:expr),+ $(,)?) => {
        $logger.log(
            $ctx,
            $level,
            &format!($fmt $(, $arg)*),
            &[$($crate::core::Field::new($key, $value)),+],
        )
    };
    ($logger:expr, $ctx:expr, $level:expr, $fmt:literal $(, $arg:expr)*) => {
        $logger.log($ctx, $level, &format!($fmt $(, $arg)*), &[])
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, $ctx, $crate::core::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, $ctx, $crate::core::Level::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = NoopLogger;
/// # let ctx = Context::background();
/// use fanout_logger::warning;
/// warning!(logger, &ctx, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, $ctx, $crate::core::Level::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, $ctx, $crate::core::Level::Error, $($arg)+)
    };
}

/// Build a `[Field; N]` from `key => value` pairs.
///
/// ```
/// use fanout_logger::fields;
///
/// let fields = fields!["user" => "ada", "attempt" => 2];
/// assert_eq!(fields.len(), 2);
/// assert_eq!(fields[0].key, "user");
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {
        [$($crate::core::Field::new($key, $value)),*]
    };
}
