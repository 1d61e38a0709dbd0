//! The backend contract shared by every logging destination

use super::{context::Context, error::Result, field::Field, level::Level};
use std::sync::Arc;

/// Shared, type-erased backend
pub type SharedLogger = Arc<dyn Logger>;

/// A logging destination
///
/// Implementations must be cheap to derive: `named`, `with` and
/// `clone_logger` return new instances and never modify the receiver.
/// Logging calls are fail-open; only [`Logger::flush`] reports errors.
///
/// # Example
///
/// ```
/// use fanout_logger::core::{Context, Field, Level, Logger, Result, SharedLogger};
/// use std::sync::Arc;
///
/// struct Stderr;
///
/// impl Logger for Stderr {
///     fn type_tag(&self) -> &str {
///         "stderr"
///     }
///     fn named(&self, _segment: &str) -> SharedLogger {
///         Arc::new(Stderr)
///     }
///     fn with(&self, _fields: &[Field]) -> SharedLogger {
///         Arc::new(Stderr)
///     }
///     fn clone_logger(&self) -> SharedLogger {
///         Arc::new(Stderr)
///     }
///     fn log(&self, _ctx: &Context, level: Level, message: &str, _fields: &[Field]) {
///         eprintln!("{} {}", level, message);
///     }
///     fn flush(&self, _ctx: &Context) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Stable identifying tag, e.g. `"console"`
    fn type_tag(&self) -> &str;

    /// Derive a logger with `segment` appended to the dotted name
    fn named(&self, segment: &str) -> SharedLogger;

    /// Derive a logger with `fields` appended to its annotations
    fn with(&self, fields: &[Field]) -> SharedLogger;

    /// Structurally equal copy owning its own delivery tracking
    fn clone_logger(&self) -> SharedLogger;

    /// Make request-scoped state of this logger retrievable from `ctx`
    fn attach(&self, ctx: &Context) -> Context {
        ctx.clone()
    }

    /// Emit one event; the backend applies its own level gate
    fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]);

    /// Wait until everything accepted so far has been delivered
    fn flush(&self, ctx: &Context) -> Result<()>;

    #[inline]
    fn debug(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Debug, message, fields);
    }

    #[inline]
    fn info(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Info, message, fields);
    }

    #[inline]
    fn warning(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Warning, message, fields);
    }

    #[inline]
    fn error(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Error, message, fields);
    }
}

/// Sanitize log message to prevent log injection attacks
///
/// Replaces newlines, carriage returns, and tabs with escape sequences
/// to prevent attackers from injecting fake log entries.
pub(crate) fn sanitize_message(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Extract a printable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_message() {
        assert_eq!(
            sanitize_message("line1\nERROR fake\r\tx"),
            "line1\\nERROR fake\\r\\tx"
        );
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
