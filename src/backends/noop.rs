//! Backend that discards everything

use crate::core::{Context, Field, Level, Logger, Result, SharedLogger};
use std::sync::Arc;

/// Discards every event; the default diagnostic logger of other backends
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl NoopLogger {
    pub fn shared() -> SharedLogger {
        Arc::new(NoopLogger)
    }
}

impl Logger for NoopLogger {
    fn type_tag(&self) -> &str {
        "noop"
    }

    fn named(&self, _segment: &str) -> SharedLogger {
        Self::shared()
    }

    fn with(&self, _fields: &[Field]) -> SharedLogger {
        Self::shared()
    }

    fn clone_logger(&self) -> SharedLogger {
        Self::shared()
    }

    fn log(&self, _ctx: &Context, _level: Level, _message: &str, _fields: &[Field]) {}

    fn flush(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}
