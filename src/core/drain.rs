//! In-flight delivery tracking and the flush barrier built on it
//!
//! An asynchronous backend calls [`DispatchCounter::accept`] on the logging
//! thread before handing work to its dispatcher. The returned
//! [`InFlightGuard`] travels with the job and decrements the counter when the
//! job finishes, fails, panics or is discarded. [`DrainBarrier::wait`] then
//! polls the counter until it reaches zero, the caller's context is
//! cancelled, or the maximum wait elapses.

use super::{
    context::Context,
    error::{LoggerError, Result},
    field::Field,
    logger::Logger,
};
use crossbeam_channel::{after, never, tick, Receiver, Select};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default interval between counter checks while draining
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default upper bound for a single flush
pub const DEFAULT_MAX_FLUSH_WAIT: Duration = Duration::from_secs(30);

/// Number of accepted but not yet completed deliveries of one backend
#[derive(Debug, Default)]
pub struct DispatchCounter {
    in_flight: AtomicUsize,
}

impl DispatchCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register one delivery; the guard completes it when dropped
    #[must_use = "dropping the guard completes the delivery immediately"]
    pub fn accept(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            counter: Arc::clone(self),
        }
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

/// Completion token for one accepted delivery
///
/// Exactly one decrement happens per guard, on `complete` or on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    counter: Arc<DispatchCounter>,
}

impl InFlightGuard {
    /// Mark the delivery as finished (success or failure)
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Flush polling configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Interval between counter checks, in milliseconds
    pub poll_interval_ms: u64,
    /// Maximum wait per flush in milliseconds; `None` waits until drained or
    /// cancelled
    pub max_wait_ms: Option<u64>,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_wait_ms: Some(DEFAULT_MAX_FLUSH_WAIT.as_millis() as u64),
        }
    }
}

impl DrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(LoggerError::config(
                "DrainConfig",
                "poll_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn barrier(&self) -> DrainBarrier {
        DrainBarrier {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_wait: self.max_wait_ms.map(Duration::from_millis),
        }
    }
}

/// How a drain wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainOutcome {
    Drained,
    Cancelled(usize),
    TimedOut(usize),
}

/// Blocking wait for a [`DispatchCounter`] to reach zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainBarrier {
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl Default for DrainBarrier {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_FLUSH_WAIT),
        }
    }
}

impl DrainBarrier {
    pub fn new(poll_interval: Duration, max_wait: Option<Duration>) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            max_wait,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Set or remove the maximum wait
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Block until `counter` drains, `ctx` is cancelled, or the maximum wait
    /// elapses
    ///
    /// Returns immediately when nothing is pending. Cancellation that races
    /// with natural completion is not an error. Progress is reported at debug
    /// level on `diagnostics`.
    pub fn wait(
        &self,
        counter: &DispatchCounter,
        ctx: &Context,
        diagnostics: &dyn Logger,
    ) -> Result<()> {
        if counter.is_idle() {
            return Ok(());
        }

        match self.poll(counter, ctx, diagnostics) {
            DrainOutcome::Drained => {
                diagnostics.info(ctx, "Flush completed, no logs remaining", &[]);
                Ok(())
            }
            DrainOutcome::Cancelled(0) => {
                diagnostics.info(ctx, "Flush cancelled, no logs remaining", &[]);
                Ok(())
            }
            DrainOutcome::Cancelled(remaining) => {
                diagnostics.error(
                    ctx,
                    "Flush cancelled before all logs were flushed",
                    &[Field::new("remaining", remaining)],
                );
                Err(LoggerError::FlushCancelled { remaining })
            }
            DrainOutcome::TimedOut(remaining) => {
                diagnostics.error(
                    ctx,
                    "Timed out waiting for logs to be flushed",
                    &[Field::new("remaining", remaining)],
                );
                Err(LoggerError::FlushTimedOut { remaining })
            }
        }
    }

    fn poll(&self, counter: &DispatchCounter, ctx: &Context, diagnostics: &dyn Logger) -> DrainOutcome {
        if ctx.is_cancelled() {
            return DrainOutcome::Cancelled(counter.pending());
        }

        let started = Instant::now();
        let ticker = tick(self.poll_interval);
        let timeout: Receiver<Instant> = match self.max_wait {
            Some(max_wait) => after(max_wait),
            None => never(),
        };
        let ctx_deadline: Receiver<Instant> = match ctx.deadline() {
            Some(deadline) => after(deadline.saturating_duration_since(started)),
            None => never(),
        };
        let cancel_sources: Vec<&Receiver<()>> = ctx.done().collect();

        let mut select = Select::new();
        let tick_idx = select.recv(&ticker);
        let timeout_idx = select.recv(&timeout);
        let deadline_idx = select.recv(&ctx_deadline);
        let cancel_base = deadline_idx + 1;
        for rx in &cancel_sources {
            select.recv(rx);
        }

        // Timers and the Select are dropped on return, so no wakeups outlive
        // the wait.
        loop {
            let op = select.select();
            let idx = op.index();
            if idx == tick_idx {
                let _ = op.recv(&ticker);
                let remaining = counter.pending();
                if remaining == 0 {
                    return DrainOutcome::Drained;
                }
                diagnostics.debug(
                    ctx,
                    "Checking for remaining logs to flush",
                    &[Field::new("remaining", remaining)],
                );
            } else if idx == timeout_idx {
                let _ = op.recv(&timeout);
                return match counter.pending() {
                    0 => DrainOutcome::Drained,
                    remaining => DrainOutcome::TimedOut(remaining),
                };
            } else if idx == deadline_idx {
                let _ = op.recv(&ctx_deadline);
                return DrainOutcome::Cancelled(counter.pending());
            } else {
                let _ = op.recv(cancel_sources[idx - cancel_base]);
                return DrainOutcome::Cancelled(counter.pending());
            }
        }
    }
}
