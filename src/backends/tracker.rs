//! Error-tracker backend
//!
//! Events at or above the event threshold are captured together with the
//! breadcrumb trail recorded so far. Less severe events that still reach the
//! breadcrumb threshold are added to the trail instead.

use super::{Clock, NoopLogger};
use crate::core::{
    can_log, Context, Field, Handle, Level, Logger, LoggerError, Result, SharedLogger,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;

pub const DEFAULT_TRACKER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A low-severity event kept as context for later captures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breadcrumb {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: JsonMap,
}

/// A captured event as handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Dot-joined name of the logger that captured the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: JsonMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// Delivers captured events to an error tracker
pub trait EventTransport: Send + Sync {
    fn capture(&self, event: TrackerEvent);

    /// Wait up to `timeout` for captured events to be delivered
    fn flush(&self, timeout: Duration) -> bool;
}

/// Bounded breadcrumb trail
#[derive(Debug)]
struct Scope {
    breadcrumbs: Mutex<VecDeque<Breadcrumb>>,
    max_breadcrumbs: usize,
}

impl Scope {
    fn new(max_breadcrumbs: usize) -> Arc<Self> {
        Arc::new(Self {
            breadcrumbs: Mutex::new(VecDeque::with_capacity(max_breadcrumbs.min(16))),
            max_breadcrumbs,
        })
    }

    /// Independent scope starting with this scope's trail
    fn fork(&self) -> Arc<Self> {
        Arc::new(Self {
            breadcrumbs: Mutex::new(self.breadcrumbs.lock().clone()),
            max_breadcrumbs: self.max_breadcrumbs,
        })
    }

    fn add(&self, breadcrumb: Breadcrumb) {
        if self.max_breadcrumbs == 0 {
            return;
        }
        let mut trail = self.breadcrumbs.lock();
        while trail.len() >= self.max_breadcrumbs {
            trail.pop_front();
        }
        trail.push_back(breadcrumb);
    }

    fn snapshot(&self) -> Vec<Breadcrumb> {
        self.breadcrumbs.lock().iter().cloned().collect()
    }
}

/// Context slot for a request-scoped breadcrumb trail
#[derive(Clone)]
struct AttachedScope(Arc<Scope>);

/// Backend reporting errors to an event tracker
///
/// ```
/// use fanout_logger::backends::{TrackerLogger, WriterTransport};
/// use fanout_logger::prelude::*;
/// use std::sync::Arc;
///
/// let tracker = TrackerLogger::builder(Arc::new(WriterTransport::new(std::io::sink()))).build();
/// let ctx = Context::background();
///
/// tracker.info(&ctx, "cache miss", &[]);                       // breadcrumb
/// tracker.error(&ctx, "payment failed", &[Field::new("order", 17)]); // captured
/// assert!(tracker.flush(&ctx).is_ok());
/// ```
pub struct TrackerLogger {
    handle: Handle,
    event_threshold: Level,
    breadcrumb_threshold: Level,
    scope: Arc<Scope>,
    transport: Arc<dyn EventTransport>,
    flush_timeout: Duration,
    diagnostics: SharedLogger,
    clock: Clock,
}

impl TrackerLogger {
    pub fn builder(transport: Arc<dyn EventTransport>) -> TrackerLoggerBuilder {
        TrackerLoggerBuilder::new(transport)
    }

    pub fn event_threshold(&self) -> Level {
        self.event_threshold
    }

    pub fn breadcrumb_threshold(&self) -> Level {
        self.breadcrumb_threshold
    }

    /// Breadcrumbs currently recorded in this logger's own scope
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.scope.snapshot()
    }

    fn derive(&self, handle: Handle) -> Self {
        Self {
            handle,
            event_threshold: self.event_threshold,
            breadcrumb_threshold: self.breadcrumb_threshold,
            scope: self.scope.fork(),
            transport: Arc::clone(&self.transport),
            flush_timeout: self.flush_timeout,
            diagnostics: Arc::clone(&self.diagnostics),
            clock: Arc::clone(&self.clock),
        }
    }

    fn scope_for<'a>(&'a self, ctx: &'a Context) -> &'a Scope {
        match ctx.value::<AttachedScope>() {
            Some(attached) => &*attached.0,
            None => &*self.scope,
        }
    }

    fn capture_event(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        let resolved = self.handle.fields().resolve(fields);
        for key in &resolved.shadowed {
            self.diagnostics.warning(
                ctx,
                "Field already exists, overwriting",
                &[Field::new("key", key.as_str())],
            );
        }
        let name = self.handle.name();

        let event = TrackerEvent {
            timestamp: (self.clock)(),
            level,
            message: message.to_string(),
            logger: (!name.is_empty()).then_some(name),
            extra: resolved.to_json_map(),
            breadcrumbs: self.scope_for(ctx).snapshot(),
        };
        self.transport.capture(event);
    }

    fn add_breadcrumb(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        self.scope_for(ctx).add(Breadcrumb {
            timestamp: (self.clock)(),
            level,
            message: message.to_string(),
            data: fields
                .iter()
                .map(|field| (field.key.clone(), field.value.to_json_value()))
                .collect(),
        });
    }
}

impl Logger for TrackerLogger {
    fn type_tag(&self) -> &str {
        "tracker"
    }

    fn named(&self, segment: &str) -> SharedLogger {
        Arc::new(self.derive(self.handle.named(segment)))
    }

    fn with(&self, fields: &[Field]) -> SharedLogger {
        Arc::new(self.derive(self.handle.with(fields)))
    }

    fn clone_logger(&self) -> SharedLogger {
        Arc::new(self.derive(self.handle.clone()))
    }

    /// Record breadcrumbs for this request in a scope carried by the context
    fn attach(&self, ctx: &Context) -> Context {
        ctx.with_value(AttachedScope(self.scope.fork()))
    }

    fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        if can_log(self.event_threshold, level) {
            self.capture_event(ctx, level, message, fields);
        } else if can_log(self.breadcrumb_threshold, level) {
            self.add_breadcrumb(ctx, level, message, fields);
        }
    }

    fn flush(&self, ctx: &Context) -> Result<()> {
        if self.transport.flush(self.flush_timeout) {
            return Ok(());
        }
        self.diagnostics.error(
            ctx,
            "Failed to flush error tracker",
            &[Field::new("timeout", self.flush_timeout)],
        );
        Err(LoggerError::TrackerFlush {
            timeout: self.flush_timeout,
        })
    }
}

impl fmt::Debug for TrackerLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerLogger")
            .field("name", &self.handle.name())
            .field("event_threshold", &self.event_threshold)
            .field("breadcrumb_threshold", &self.breadcrumb_threshold)
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}

/// Builder for [`TrackerLogger`]
pub struct TrackerLoggerBuilder {
    transport: Arc<dyn EventTransport>,
    name: Option<String>,
    fields: Vec<Field>,
    event_threshold: Level,
    breadcrumb_threshold: Level,
    max_breadcrumbs: usize,
    flush_timeout: Duration,
    diagnostics: Option<SharedLogger>,
    clock: Clock,
}

impl TrackerLoggerBuilder {
    pub fn new(transport: Arc<dyn EventTransport>) -> Self {
        Self {
            transport,
            name: None,
            fields: Vec::new(),
            event_threshold: Level::Error,
            breadcrumb_threshold: Level::Info,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            flush_timeout: DEFAULT_TRACKER_FLUSH_TIMEOUT,
            diagnostics: None,
            clock: Arc::new(Utc::now),
        }
    }

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

    /// Lowest severity captured as an event
    #[must_use]
    pub fn event_threshold(mut self, level: Level) -> Self {
        self.event_threshold = level;
        self
    }

    /// Lowest severity recorded as a breadcrumb
    #[must_use]
    pub fn breadcrumb_threshold(mut self, level: Level) -> Self {
        self.breadcrumb_threshold = level;
        self
    }

    #[must_use]
    pub fn max_breadcrumbs(mut self, max: usize) -> Self {
        self.max_breadcrumbs = max;
        self
    }

    #[must_use]
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    #[must_use]
    pub fn diagnostics(mut self, diagnostics: SharedLogger) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> TrackerLogger {
        let handle = self
            .name
            .as_deref()
            .map(Handle::with_name)
            .unwrap_or_default()
            .with(&self.fields);

        TrackerLogger {
            handle,
            event_threshold: self.event_threshold,
            breadcrumb_threshold: self.breadcrumb_threshold,
            scope: Scope::new(self.max_breadcrumbs),
            transport: self.transport,
            flush_timeout: self.flush_timeout,
            diagnostics: self.diagnostics.unwrap_or_else(NoopLogger::shared),
            clock: self.clock,
        }
    }
}

/// [`EventTransport`] writing one JSON object per captured event
pub struct WriterTransport {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterTransport {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl EventTransport for WriterTransport {
    fn capture(&self, event: TrackerEvent) {
        let mut writer = self.writer.lock();
        let result = serde_json::to_writer(&mut *writer, &event)
            .map_err(LoggerError::from)
            .and_then(|()| writer.write_all(b"\n").map_err(LoggerError::from));

        if let Err(e) = result {
            eprintln!("[LOGGER ERROR] Failed to write tracker event: {}", e);
        }
    }

    fn flush(&self, timeout: Duration) -> bool {
        match self.writer.try_lock_for(timeout) {
            Some(mut writer) => writer.flush().is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for WriterTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterTransport").finish_non_exhaustive()
    }
}
