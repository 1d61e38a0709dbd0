//! Overflow policies for the asynchronous dispatch queue
//!
//! When a dispatcher's queue is full, these policies decide whether the
//! submitting thread waits for space or the delivery is dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling queue overflow in asynchronous delivery
///
/// # Example
///
/// ```
/// use fanout_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
///
/// // Wait up to 50ms for space, then drop
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new delivery silently; metrics still count it
    DropNewest,

    /// Block until space is available
    ///
    /// Warning: this applies backpressure to every logging caller.
    Block,

    /// Block with timeout, then drop
    BlockWithTimeout(Duration),

    /// Drop but alert via callback and stderr
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when deliveries are dropped due to queue overflow.
/// The parameter is the total count of dropped deliveries so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
