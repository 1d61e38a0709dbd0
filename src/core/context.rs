//! Request-scoped context: typed values, cancellation and deadlines
//!
//! A `Context` is immutable; every `with_*` call returns a derived context
//! that inherits the parent's values, cancellation sources and deadline.
//! Cancellation is signalled by closing a channel, so waiters can select on
//! it together with timers.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

type ValueMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

type SenderSlot = Arc<Mutex<Option<Sender<()>>>>;

#[derive(Clone, Default)]
pub struct Context {
    values: Arc<ValueMap>,
    done: Arc<Vec<CancelSource>>,
    deadline: Option<Instant>,
}

/// A cancellation channel; the context keeps the sender slot alive so only an
/// explicit `cancel` closes it
#[derive(Clone)]
struct CancelSource {
    receiver: Receiver<()>,
    _sender: SenderSlot,
}

/// Cancels the context it was created with, and everything derived from it
///
/// Dropping the handle does not cancel.
#[derive(Clone)]
pub struct CancelHandle {
    sender: SenderSlot,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Context {
    /// Empty context: no values, never cancelled, no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that is cancelled when the returned handle fires
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (sender, receiver) = bounded::<()>(0);
        let slot: SenderSlot = Arc::new(Mutex::new(Some(sender)));
        let mut done = Vec::with_capacity(self.done.len() + 1);
        done.extend(self.done.iter().cloned());
        // Nothing is ever sent: taking the sender out of the slot closes the
        // channel and wakes every receiver.
        done.push(CancelSource {
            receiver,
            _sender: Arc::clone(&slot),
        });

        let handle = CancelHandle { sender: slot };
        let ctx = Self {
            values: Arc::clone(&self.values),
            done: Arc::new(done),
            deadline: self.deadline,
        };
        (ctx, handle)
    }

    /// Derive a context whose deadline is `timeout` from now
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with an absolute deadline; an earlier inherited
    /// deadline is kept
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        };
        Self {
            values: Arc::clone(&self.values),
            done: Arc::clone(&self.done),
            deadline: Some(deadline),
        }
    }

    /// Derive a context carrying `value`, replacing any value of the same type
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            values: Arc::new(values),
            done: Arc::clone(&self.done),
            deadline: self.deadline,
        }
    }

    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancellation channels; each is disconnected once cancelled
    pub fn done(&self) -> impl Iterator<Item = &Receiver<()>> {
        self.done.iter().map(|source| &source.receiver)
    }

    /// True when any cancellation source fired or the deadline passed
    pub fn is_cancelled(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        self.done()
            .any(|rx| matches!(rx.try_recv(), Err(TryRecvError::Disconnected)))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values.len())
            .field("cancel_sources", &self.done.len())
            .field("deadline", &self.deadline)
            .finish()
    }
}
