//! Synchronous console backend

use crate::core::{
    can_log, Context, Field, Handle, Level, Logger, LoggerError, OutputFormat, Record, Result,
    SharedLogger, TimestampFormat,
};
use crate::backends::NoopLogger;
#[cfg(feature = "console")]
use crate::core::logger::sanitize_message;
#[cfg(feature = "console")]
use colored::Colorize;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Shared, lockable output stream
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Where rendered lines go
#[derive(Clone, Default)]
pub enum ConsoleTarget {
    /// Error events to stderr, everything else to stdout
    #[default]
    Std,
    /// Every line to one writer
    Writer(SharedWriter),
}

impl ConsoleTarget {
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        ConsoleTarget::Writer(Arc::new(Mutex::new(Box::new(writer))))
    }

    fn write_line(&self, level: Level, line: &str) -> io::Result<()> {
        match self {
            ConsoleTarget::Std if level == Level::Error => writeln!(io::stderr().lock(), "{}", line),
            ConsoleTarget::Std => writeln!(io::stdout().lock(), "{}", line),
            ConsoleTarget::Writer(writer) => writeln!(writer.lock(), "{}", line),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            ConsoleTarget::Std => {
                io::stdout().flush()?;
                io::stderr().flush()
            }
            ConsoleTarget::Writer(writer) => writer.lock().flush(),
        }
    }

    #[cfg_attr(not(feature = "console"), allow(dead_code))]
    fn is_terminal_stream(&self) -> bool {
        matches!(self, ConsoleTarget::Std)
    }
}

impl fmt::Debug for ConsoleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleTarget::Std => write!(f, "Std"),
            ConsoleTarget::Writer(_) => write!(f, "Writer"),
        }
    }
}

/// Serializable console settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub threshold: Level,
    pub format: OutputFormat,
    pub timestamp_format: TimestampFormat,
    pub use_colors: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            threshold: Level::Debug,
            format: OutputFormat::Text,
            timestamp_format: TimestampFormat::Iso8601,
            use_colors: true,
        }
    }
}

/// Writes each event as one line, synchronously
///
/// # Example
///
/// ```
/// use fanout_logger::backends::ConsoleLogger;
/// use fanout_logger::prelude::*;
///
/// let console = ConsoleLogger::builder()
///     .threshold(Level::Info)
///     .format(OutputFormat::Logfmt)
///     .build();
///
/// let ctx = Context::background();
/// console.named("api").info(&ctx, "listening", &[Field::new("port", 8080)]);
/// ```
#[derive(Clone)]
pub struct ConsoleLogger {
    handle: Handle,
    threshold: Level,
    format: OutputFormat,
    timestamp_format: TimestampFormat,
    use_colors: bool,
    target: ConsoleTarget,
    diagnostics: SharedLogger,
}

impl fmt::Debug for ConsoleLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLogger")
            .field("name", &self.handle.name())
            .field("threshold", &self.threshold)
            .field("format", &self.format)
            .field("target", &self.target)
            .finish()
    }
}

/// Context slot for a request-scoped console logger
#[derive(Clone)]
struct AttachedConsole(ConsoleLogger);

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ConsoleLoggerBuilder {
        ConsoleLoggerBuilder::default()
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::builder()
            .threshold(config.threshold)
            .format(config.format)
            .timestamp_format(config.timestamp_format.clone())
            .colors(config.use_colors)
            .build()
    }

    pub fn threshold(&self) -> Level {
        self.threshold
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn target(&self) -> &ConsoleTarget {
        &self.target
    }

    #[must_use]
    pub fn derive_named(&self, segment: &str) -> Self {
        Self {
            handle: self.handle.named(segment),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn derive_with(&self, fields: &[Field]) -> Self {
        Self {
            handle: self.handle.with(fields),
            ..self.clone()
        }
    }

    /// Render and write one event, ignoring any attached console
    pub fn emit(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        if !can_log(self.threshold, level) {
            return;
        }

        let record = Record::new(&self.handle, level, message, fields);
        for key in record.shadowed() {
            self.diagnostics.warning(
                ctx,
                "Field already exists, overwriting",
                &[Field::new("key", key.as_str())],
            );
        }

        let line = self.render(&record);
        if let Err(e) = self.target.write_line(level, &line) {
            self.diagnostics
                .error(ctx, "Failed to write log line", &[Field::error(&e)]);
        }
    }

    fn render(&self, record: &Record) -> String {
        #[cfg(feature = "console")]
        if self.use_colors
            && self.format == OutputFormat::Text
            && self.target.is_terminal_stream()
        {
            return self.render_colored(record);
        }

        self.format.format(record, &self.timestamp_format)
    }

    #[cfg(feature = "console")]
    fn render_colored(&self, record: &Record) -> String {
        let level = format!("{:7}", record.level.to_str())
            .color(record.level.color_code())
            .to_string();

        let mut line = format!(
            "[{}] [{}]",
            self.timestamp_format.format(&record.timestamp),
            level
        );
        if !record.name.is_empty() {
            line.push(' ');
            line.push_str(&record.name.bold().to_string());
        }
        line.push_str(" - ");
        line.push_str(&sanitize_message(&record.message));
        if !record.fields.is_empty() {
            line.push(' ');
            line.push_str(&record.fields.format_fields());
        }
        line
    }

    /// Flush the output target
    pub fn flush_target(&self) -> Result<()> {
        self.target
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing console", "console output", e))
    }
}

impl Logger for ConsoleLogger {
    fn type_tag(&self) -> &str {
        "console"
    }

    fn named(&self, segment: &str) -> SharedLogger {
        Arc::new(self.derive_named(segment))
    }

    fn with(&self, fields: &[Field]) -> SharedLogger {
        Arc::new(self.derive_with(fields))
    }

    fn clone_logger(&self) -> SharedLogger {
        Arc::new(self.clone())
    }

    fn attach(&self, ctx: &Context) -> Context {
        ctx.with_value(AttachedConsole(self.clone()))
    }

    fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        match ctx.value::<AttachedConsole>() {
            Some(attached) => attached.0.emit(ctx, level, message, fields),
            None => self.emit(ctx, level, message, fields),
        }
    }

    fn flush(&self, ctx: &Context) -> Result<()> {
        match ctx.value::<AttachedConsole>() {
            Some(attached) => attached.0.flush_target(),
            None => self.flush_target(),
        }
    }
}

/// Builder for [`ConsoleLogger`]
pub struct ConsoleLoggerBuilder {
    name: Option<String>,
    fields: Vec<Field>,
    threshold: Level,
    format: OutputFormat,
    timestamp_format: TimestampFormat,
    use_colors: bool,
    target: ConsoleTarget,
    diagnostics: Option<SharedLogger>,
}

impl Default for ConsoleLoggerBuilder {
    fn default() -> Self {
        let config = ConsoleConfig::default();
        Self {
            name: None,
            fields: Vec::new(),
            threshold: config.threshold,
            format: config.format,
            timestamp_format: config.timestamp_format,
            use_colors: config.use_colors,
            target: ConsoleTarget::Std,
            diagnostics: None,
        }
    }
}

impl ConsoleLoggerBuilder {
    /// Dot-separated root name
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: &[Field]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: Level) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    /// Send every line to `writer` instead of stdout/stderr
    #[must_use]
    pub fn writer(self, writer: impl Write + Send + 'static) -> Self {
        self.target(ConsoleTarget::writer(writer))
    }

    /// Logger receiving this backend's own operational messages
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: SharedLogger) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn build(self) -> ConsoleLogger {
        let handle = self
            .name
            .as_deref()
            .map(Handle::with_name)
            .unwrap_or_default()
            .with(&self.fields);

        ConsoleLogger {
            handle,
            threshold: self.threshold,
            format: self.format,
            timestamp_format: self.timestamp_format,
            use_colors: self.use_colors,
            target: self.target,
            diagnostics: self.diagnostics.unwrap_or_else(NoopLogger::shared),
        }
    }
}
