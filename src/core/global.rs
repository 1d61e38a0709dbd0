//! Process-wide default facade
//!
//! Code that receives a [`Context`] should resolve its logger with
//! [`from_context`], which prefers a facade attached to the context and falls
//! back to the default installed here. The default is empty until [`init`]
//! or [`replace`] installs one, and [`teardown`] flushes it and resets it.

use super::{context::Context, error::Result, facade::LogFacade};
use parking_lot::RwLock;
use std::sync::Arc;

static DEFAULT_FACADE: RwLock<Option<Arc<LogFacade>>> = parking_lot::const_rwlock(None);

/// Install `facade` as the default unless one is already installed
///
/// Returns `false` when a default already existed; use [`replace`] to swap it.
pub fn init(facade: LogFacade) -> bool {
    let mut slot = DEFAULT_FACADE.write();
    if slot.is_some() {
        return false;
    }
    *slot = Some(Arc::new(facade));
    true
}

/// Install `facade` as the default, returning the previous one
pub fn replace(facade: LogFacade) -> Option<Arc<LogFacade>> {
    DEFAULT_FACADE.write().replace(Arc::new(facade))
}

/// The default facade, or an empty one before initialisation
pub fn get() -> Arc<LogFacade> {
    DEFAULT_FACADE
        .read()
        .as_ref()
        .map(Arc::clone)
        .unwrap_or_else(|| Arc::new(LogFacade::new()))
}

pub fn is_initialized() -> bool {
    DEFAULT_FACADE.read().is_some()
}

/// Facade attached to `ctx`, otherwise the default
pub fn from_context(ctx: &Context) -> Arc<LogFacade> {
    ctx.logger().unwrap_or_else(get)
}

/// Facade from `ctx` with each segment appended to its name
pub fn named(ctx: &Context, segments: &[&str]) -> Arc<LogFacade> {
    let facade = from_context(ctx);
    match segments.split_first() {
        Some((first, rest)) => Arc::new(
            rest.iter()
                .fold(facade.named(first), |derived, segment| derived.named(segment)),
        ),
        None => facade,
    }
}

/// Flush the default facade
pub fn flush(ctx: &Context) -> Result<()> {
    let facade = DEFAULT_FACADE.read().as_ref().map(Arc::clone);
    match facade {
        Some(facade) => facade.flush(ctx),
        None => Ok(()),
    }
}

/// Flush the default facade and uninstall it
pub fn teardown(ctx: &Context) -> Result<()> {
    let facade = DEFAULT_FACADE.write().take();
    match facade {
        Some(facade) => facade.flush(ctx),
        None => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::GLOBAL_GUARD;
    use super::*;
    use crate::backends::NoopLogger;

    #[test]
    fn test_lifecycle() {
        let _guard = GLOBAL_GUARD.lock();
        let _ = teardown(&Context::background());

        assert!(!is_initialized());
        assert!(get().is_empty());
        assert!(flush(&Context::background()).is_ok());

        assert!(init(LogFacade::builder().backend(Arc::new(NoopLogger)).build()));
        assert!(!init(LogFacade::new()));
        assert_eq!(get().backend_tags(), vec!["noop"]);

        let previous = replace(LogFacade::new()).expect("previous default");
        assert_eq!(previous.len(), 1);
        assert!(get().is_empty());

        assert!(teardown(&Context::background()).is_ok());
        assert!(!is_initialized());
    }

    #[test]
    fn test_context_takes_precedence() {
        let _guard = GLOBAL_GUARD.lock();
        replace(LogFacade::new());

        let attached = LogFacade::builder().backend(Arc::new(NoopLogger)).build();
        let ctx = attached.attach(&Context::background());

        assert_eq!(from_context(&ctx).len(), 1);
        assert!(from_context(&Context::background()).is_empty());
        assert_eq!(named(&ctx, &["api", "auth"]).len(), 1);

        let _ = teardown(&Context::background());
    }
}
