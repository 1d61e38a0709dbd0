//! File backend: a console logger writing JSON lines to an append-only file

use super::console::{ConsoleLogger, ConsoleLoggerBuilder};
use crate::core::{Context, Field, Level, Logger, LoggerError, OutputFormat, Result, SharedLogger};
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appends one rendered line per event to a file
///
/// Lines are buffered; call [`Logger::flush`] to push them to disk. The
/// buffer is also flushed when the last clone is dropped.
///
/// ```no_run
/// use fanout_logger::backends::FileLogger;
/// use fanout_logger::prelude::*;
///
/// let file = FileLogger::open("/var/log/app.log")?;
/// let ctx = Context::background();
/// file.error(&ctx, "disk almost full", &[Field::new("free_mb", 12)]);
/// file.flush(&ctx)?;
/// # Ok::<(), fanout_logger::LoggerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileLogger {
    inner: ConsoleLogger,
    path: Arc<PathBuf>,
}

impl FileLogger {
    /// Open `path` for appending with JSON lines at debug threshold
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, |builder| builder)
    }

    /// Open `path` and customise the wrapped console builder
    ///
    /// The builder starts in JSON format; its output target is replaced by
    /// the file.
    pub fn open_with(
        path: impl AsRef<Path>,
        configure: impl FnOnce(ConsoleLoggerBuilder) -> ConsoleLoggerBuilder,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        let builder = ConsoleLogger::builder()
            .format(OutputFormat::Json)
            .colors(false);
        let inner = configure(builder).writer(BufWriter::new(file)).build();

        Ok(Self {
            inner,
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> Level {
        self.inner.threshold()
    }

    fn wrap(&self, inner: ConsoleLogger) -> SharedLogger {
        Arc::new(Self {
            inner,
            path: Arc::clone(&self.path),
        })
    }
}

impl Logger for FileLogger {
    fn type_tag(&self) -> &str {
        "file"
    }

    fn named(&self, segment: &str) -> SharedLogger {
        self.wrap(self.inner.derive_named(segment))
    }

    fn with(&self, fields: &[Field]) -> SharedLogger {
        self.wrap(self.inner.derive_with(fields))
    }

    fn clone_logger(&self) -> SharedLogger {
        self.wrap(self.inner.clone())
    }

    // No attach: an attached file logger would be picked up by console
    // backends reading the same context slot.

    fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        self.inner.emit(ctx, level, message, fields);
    }

    fn flush(&self, _ctx: &Context) -> Result<()> {
        self.inner.flush_target()
    }
}

impl Drop for FileLogger {
    fn drop(&mut self) {
        // Derived loggers share the buffer; flush when the last one goes away
        if Arc::strong_count(&self.path) == 1 {
            let _ = self.inner.flush_target();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_writes_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = FileLogger::open(&path).unwrap();
        let ctx = Context::background();

        logger.named("db").info(&ctx, "connected", &[Field::new("pool", 4)]);
        logger.debug(&ctx, "root event", &[]);
        logger.flush(&ctx).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["name"], "db");
        assert_eq!(lines[0]["level"], "INFO");
        assert_eq!(lines[0]["fields"]["pool"], 4);
        assert!(lines[1].get("name").is_none());
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing\n").unwrap();

        let logger = FileLogger::open(&path).unwrap();
        logger.warning(&Context::background(), "appended", &[]);
        logger.flush(&Context::background()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_open_failure_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("app.log");

        let err = FileLogger::open(&path).unwrap_err();
        assert!(matches!(err, LoggerError::IoOperation { .. }));
    }

    #[test]
    fn test_open_with_text_format_and_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = FileLogger::open_with(&path, |builder| {
            builder.format(OutputFormat::Text).threshold(Level::Error)
        })
        .unwrap();
        let ctx = Context::background();

        logger.info(&ctx, "filtered", &[]);
        logger.error(&ctx, "kept", &[]);
        drop(logger);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("[ERROR  ] - kept"));
    }
}
