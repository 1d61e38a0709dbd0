//! The fan-out facade
//!
//! A [`LogFacade`] forwards every call to each registered backend in
//! registration order. It applies no level threshold of its own. Backends are
//! called one at a time under `catch_unwind`, so a panicking backend neither
//! skips the remaining backends nor reaches the caller. Only `flush` reports
//! errors, aggregated per backend.

use super::{
    context::Context,
    error::{FlushErrors, LoggerError, Result},
    field::Field,
    level::Level,
    logger::{panic_message, Logger, SharedLogger},
};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Multiplexer over an ordered list of backends
///
/// # Example
///
/// ```
/// use fanout_logger::prelude::*;
/// use std::sync::Arc;
///
/// let facade = LogFacade::builder()
///     .backend(Arc::new(NoopLogger))
///     .build();
///
/// let ctx = Context::background();
/// facade.info(&ctx, "service started", &[Field::new("port", 8080)]);
/// assert!(facade.flush(&ctx).is_ok());
/// ```
#[derive(Default)]
pub struct LogFacade {
    backends: RwLock<Vec<SharedLogger>>,
    backend_panics: AtomicU64,
}

/// Context slot holding an attached facade
#[derive(Clone)]
struct AttachedFacade(Arc<LogFacade>);

impl LogFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> LogFacadeBuilder {
        LogFacadeBuilder::new()
    }

    fn from_backends(backends: Vec<SharedLogger>) -> Self {
        Self {
            backends: RwLock::new(backends),
            backend_panics: AtomicU64::new(0),
        }
    }

    /// Register a backend; `None` is ignored
    pub fn add_backend(&self, backend: Option<SharedLogger>) {
        if let Some(backend) = backend {
            self.add(backend);
        }
    }

    pub fn add(&self, backend: SharedLogger) {
        self.backends.write().push(backend);
    }

    /// Overwrite the first backend tagged `type_tag`, keeping its position;
    /// append when none matches
    pub fn replace_backend(&self, type_tag: &str, backend: SharedLogger) {
        let mut backends = self.backends.write();
        match backends.iter_mut().find(|b| b.type_tag() == type_tag) {
            Some(slot) => *slot = backend,
            None => backends.push(backend),
        }
    }

    /// First backend tagged `type_tag`
    pub fn get_backend(&self, type_tag: &str) -> Option<SharedLogger> {
        self.backends
            .read()
            .iter()
            .find(|b| b.type_tag() == type_tag)
            .cloned()
    }

    /// Remove the first backend tagged `type_tag`
    pub fn remove_backend(&self, type_tag: &str) -> Option<SharedLogger> {
        let mut backends = self.backends.write();
        let idx = backends.iter().position(|b| b.type_tag() == type_tag)?;
        Some(backends.remove(idx))
    }

    pub fn backend_tags(&self) -> Vec<String> {
        self.backends
            .read()
            .iter()
            .map(|b| b.type_tag().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backends.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.read().is_empty()
    }

    /// Number of backend calls that panicked and were contained
    pub fn backend_panics(&self) -> u64 {
        self.backend_panics.load(Ordering::Relaxed)
    }

    // Backends are never called with the lock held, so a backend may
    // register or remove backends on this facade without deadlocking.
    fn snapshot(&self) -> Vec<SharedLogger> {
        self.backends.read().clone()
    }

    fn derive(&self, f: impl Fn(&SharedLogger) -> SharedLogger) -> Self {
        Self::from_backends(self.snapshot().iter().map(f).collect())
    }

    /// Facade whose backends each have `segment` appended to their name
    #[must_use]
    pub fn named(&self, segment: &str) -> Self {
        self.derive(|b| b.named(segment))
    }

    #[must_use]
    pub fn with(&self, fields: &[Field]) -> Self {
        self.derive(|b| b.with(fields))
    }

    /// Independent copy; every backend is cloned
    #[must_use]
    pub fn clone_facade(&self) -> Self {
        self.derive(|b| b.clone_logger())
    }

    /// Let each backend attach its request state, then store this facade
    pub fn attach(&self, ctx: &Context) -> Context {
        let backends = self.snapshot();
        let ctx = backends
            .iter()
            .fold(ctx.clone(), |ctx, backend| backend.attach(&ctx));
        ctx.with_logger(Arc::new(Self::from_backends(backends)))
    }

    pub fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        for backend in self.snapshot() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                backend.log(ctx, level, message, fields);
            }));

            if let Err(panic_info) = result {
                self.backend_panics.fetch_add(1, Ordering::Relaxed);
                eprintln!(
                    "[LOGGER CRITICAL] Backend '{}' panicked: {}. \
                     Continuing with the remaining backends.",
                    backend.type_tag(),
                    panic_message(panic_info.as_ref())
                );
            }
        }
    }

    pub fn debug(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Debug, message, fields);
    }

    pub fn info(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Info, message, fields);
    }

    pub fn warning(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Warning, message, fields);
    }

    pub fn error(&self, ctx: &Context, message: &str, fields: &[Field]) {
        self.log(ctx, Level::Error, message, fields);
    }

    /// Flush every backend, even after earlier failures
    ///
    /// Failures are returned together as [`LoggerError::Flush`] in
    /// registration order.
    pub fn flush(&self, ctx: &Context) -> Result<()> {
        let mut errors = FlushErrors::new();

        for (position, backend) in self.snapshot().iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| backend.flush(ctx)))
                .unwrap_or_else(|panic_info| {
                    self.backend_panics.fetch_add(1, Ordering::Relaxed);
                    Err(LoggerError::other(format!(
                        "backend panicked during flush: {}",
                        panic_message(panic_info.as_ref())
                    )))
                });

            if let Err(e) = result {
                errors.push(position, backend.type_tag(), e);
            }
        }

        errors.into_result()
    }
}

impl Logger for LogFacade {
    fn type_tag(&self) -> &str {
        "facade"
    }

    fn named(&self, segment: &str) -> SharedLogger {
        Arc::new(LogFacade::named(self, segment))
    }

    fn with(&self, fields: &[Field]) -> SharedLogger {
        Arc::new(LogFacade::with(self, fields))
    }

    fn clone_logger(&self) -> SharedLogger {
        Arc::new(self.clone_facade())
    }

    fn attach(&self, ctx: &Context) -> Context {
        LogFacade::attach(self, ctx)
    }

    fn log(&self, ctx: &Context, level: Level, message: &str, fields: &[Field]) {
        LogFacade::log(self, ctx, level, message, fields);
    }

    fn flush(&self, ctx: &Context) -> Result<()> {
        LogFacade::flush(self, ctx)
    }
}

impl fmt::Debug for LogFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFacade")
            .field("backends", &self.backend_tags())
            .field("backend_panics", &self.backend_panics())
            .finish()
    }
}

impl Context {
    /// Derive a context carrying `facade`
    #[must_use]
    pub fn with_logger(&self, facade: Arc<LogFacade>) -> Context {
        self.with_value(AttachedFacade(facade))
    }

    /// Facade attached with [`Context::with_logger`], if any
    pub fn logger(&self) -> Option<Arc<LogFacade>> {
        self.value::<AttachedFacade>()
            .map(|attached| Arc::clone(&attached.0))
    }
}

/// Builder for [`LogFacade`]
#[derive(Default)]
pub struct LogFacadeBuilder {
    backends: Vec<SharedLogger>,
}

impl LogFacadeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(mut self, backend: SharedLogger) -> Self {
        self.backends.push(backend);
        self
    }

    /// Add a backend when present, e.g. one that failed to initialise
    #[must_use]
    pub fn optional_backend(mut self, backend: Option<SharedLogger>) -> Self {
        self.backends.extend(backend);
        self
    }

    pub fn build(self) -> LogFacade {
        LogFacade::from_backends(self.backends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handle::Handle;
    use parking_lot::Mutex;

    /// Backend recording what reaches it
    struct Recorder {
        tag: String,
        handle: Handle,
        seen: Arc<Mutex<Vec<(Level, String, String)>>>,
        fail_flush: bool,
        panic_on_log: bool,
    }

    impl Recorder {
        fn new(tag: &str) -> (Arc<Self>, Arc<Mutex<Vec<(Level, String, String)>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let recorder = Arc::new(Self {
                tag: tag.to_string(),
                handle: Handle::new(),
                seen: Arc::clone(&seen),
                fail_flush: false,
                panic_on_log: false,
            });
            (recorder, seen)
        }

        fn derived(&self, handle: Handle) -> SharedLogger {
            Arc::new(Self {
                tag: self.tag.clone(),
                handle,
                seen: Arc::clone(&self.seen),
                fail_flush: self.fail_flush,
                panic_on_log: self.panic_on_log,
            })
        }
    }

    impl Logger for Recorder {
        fn type_tag(&self) -> &str {
            &self.tag
        }
        fn named(&self, segment: &str) -> SharedLogger {
            self.derived(self.handle.named(segment))
        }
        fn with(&self, fields: &[Field]) -> SharedLogger {
            self.derived(self.handle.with(fields))
        }
        fn clone_logger(&self) -> SharedLogger {
            self.derived(self.handle.clone())
        }
        fn log(&self, _ctx: &Context, level: Level, message: &str, _fields: &[Field]) {
            if self.panic_on_log {
                panic!("backend {} exploded", self.tag);
            }
            self.seen
                .lock()
                .push((level, self.handle.name(), message.to_string()));
        }
        fn flush(&self, _ctx: &Context) -> Result<()> {
            if self.fail_flush {
                Err(LoggerError::writer(format!("{} flush failed", self.tag)))
            } else {
                Ok(())
            }
        }
    }

    fn failing(tag: &str, panic_on_log: bool, fail_flush: bool) -> SharedLogger {
        Arc::new(Recorder {
            tag: tag.to_string(),
            handle: Handle::new(),
            seen: Arc::new(Mutex::new(Vec::new())),
            fail_flush,
            panic_on_log,
        })
    }

    #[test]
    fn test_forwards_to_every_backend_in_order() {
        let (a, seen_a) = Recorder::new("a");
        let (b, seen_b) = Recorder::new("b");
        let facade = LogFacade::builder().backend(a).backend(b).build();

        let ctx = Context::background();
        facade.debug(&ctx, "one", &[]);
        facade.error(&ctx, "two", &[]);

        assert_eq!(seen_a.lock().len(), 2);
        assert_eq!(seen_b.lock()[1].0, Level::Error);
        assert_eq!(facade.backend_tags(), vec!["a", "b"]);
    }

    #[test]
    fn test_panicking_backend_is_isolated() {
        let (a, seen_a) = Recorder::new("a");
        let (c, seen_c) = Recorder::new("c");
        let facade = LogFacade::builder()
            .backend(a)
            .backend(failing("b", true, false))
            .backend(c)
            .build();

        facade.info(&Context::background(), "hello", &[]);

        assert_eq!(seen_a.lock().len(), 1);
        assert_eq!(seen_c.lock().len(), 1);
        assert_eq!(facade.backend_panics(), 1);
    }

    #[test]
    fn test_flush_aggregates_failures() {
        let (a, _) = Recorder::new("a");
        let (c, _) = Recorder::new("c");
        let facade = LogFacade::builder()
            .backend(a)
            .backend(failing("b", false, true))
            .backend(c)
            .build();

        let err = facade.flush(&Context::background()).unwrap_err();
        match err {
            LoggerError::Flush(failures) => {
                assert_eq!(failures.len(), 1);
                let failure = failures.iter().next().unwrap();
                assert_eq!(failure.position, 1);
                assert_eq!(failure.type_tag, "b");
                assert!(failures.get("b").unwrap().to_string().contains("b flush failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_facade_flush_is_ok() {
        let facade = LogFacade::new();
        assert!(facade.is_empty());
        facade.info(&Context::background(), "nobody listens", &[]);
        assert!(facade.flush(&Context::background()).is_ok());
    }

    #[test]
    fn test_add_backend_ignores_none() {
        let facade = LogFacade::new();
        facade.add_backend(None);
        assert_eq!(facade.len(), 0);

        let (a, _) = Recorder::new("a");
        facade.add_backend(Some(a as SharedLogger));
        assert_eq!(facade.len(), 1);
    }

    #[test]
    fn test_replace_keeps_position_or_appends() {
        let (a, _) = Recorder::new("a");
        let (b, _) = Recorder::new("b");
        let (b2, seen_b2) = Recorder::new("b");
        let (c, _) = Recorder::new("c");
        let facade = LogFacade::builder().backend(a).backend(b).build();

        facade.replace_backend("b", b2);
        assert_eq!(facade.backend_tags(), vec!["a", "b"]);
        facade.info(&Context::background(), "x", &[]);
        assert_eq!(seen_b2.lock().len(), 1);

        facade.replace_backend("c", c);
        assert_eq!(facade.backend_tags(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_get_and_remove_backend() {
        let (a, _) = Recorder::new("a");
        let (b, _) = Recorder::new("b");
        let facade = LogFacade::builder().backend(a).backend(b).build();

        assert_eq!(facade.get_backend("b").unwrap().type_tag(), "b");
        assert!(facade.get_backend("missing").is_none());

        assert!(facade.remove_backend("a").is_some());
        assert_eq!(facade.backend_tags(), vec!["b"]);
        assert!(facade.remove_backend("a").is_none());
    }

    #[test]
    fn test_derivation_leaves_parent_untouched() {
        let (a, seen) = Recorder::new("a");
        let facade = LogFacade::builder().backend(a).build();
        let named = facade.named("api").named("auth");

        let ctx = Context::background();
        named.info(&ctx, "child", &[]);
        facade.info(&ctx, "parent", &[]);

        let seen = seen.lock();
        assert_eq!(seen[0].1, "api.auth");
        assert_eq!(seen[1].1, "");

        let (extra, _) = Recorder::new("extra");
        named.add(extra);
        assert_eq!(facade.len(), 1);
    }

    #[test]
    fn test_attach_stores_facade_in_context() {
        let (a, seen) = Recorder::new("a");
        let facade = LogFacade::builder().backend(a).build().named("req");

        let ctx = facade.attach(&Context::background());
        let attached = ctx.logger().expect("facade attached");
        attached.info(&ctx, "from context", &[]);

        assert_eq!(seen.lock()[0].1, "req");
        assert!(Context::background().logger().is_none());
    }

    #[test]
    fn test_facades_nest() {
        let (a, seen) = Recorder::new("a");
        let inner: SharedLogger = Arc::new(LogFacade::builder().backend(a).build());
        let outer = LogFacade::builder().backend(inner).build();

        outer.warning(&Context::background(), "nested", &[]);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(outer.backend_tags(), vec!["facade"]);
    }
}
