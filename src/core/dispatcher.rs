//! Bounded worker pool for asynchronous log delivery
//!
//! Deliveries are queued on a bounded channel and executed by a fixed set of
//! worker threads, so log volume can never spawn unbounded work. When the
//! queue is full the configured [`OverflowPolicy`] decides whether the caller
//! waits or the delivery is dropped. A dropped job is dropped *with* its
//! captured state, so any [`InFlightGuard`](super::drain::InFlightGuard) it
//! owns still completes.
//!
//! Jobs run concurrently on several workers: delivery order is not FIFO.

use super::{
    error::{LoggerError, Result},
    logger::panic_message,
    metrics::DispatchMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for dispatcher cleanup (5 seconds)
///
/// This timeout is used when the dispatcher is dropped without explicit
/// shutdown. For custom timeout control, use [`Dispatcher::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A unit of delivery work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool sizing and overflow behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Maximum queued jobs before the overflow policy applies
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Prefix for worker thread names
    pub thread_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
            queue_capacity: 1024,
            overflow_policy: OverflowPolicy::AlertAndDrop,
            thread_name: "log-dispatch".to_string(),
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(LoggerError::config(
                "DispatcherConfig",
                "workers must be greater than zero",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "DispatcherConfig",
                "queue_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

pub struct Dispatcher {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    metrics: Arc<DispatchMetrics>,
    capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
}

impl Dispatcher {
    /// Start the worker threads
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        Self::with_overflow_callback(config, None)
    }

    /// Start the worker threads with an overflow notification callback
    pub fn with_overflow_callback(
        config: DispatcherConfig,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = bounded::<Job>(config.queue_capacity);
        let metrics = Arc::new(DispatchMetrics::new());

        let mut workers = Vec::with_capacity(config.workers);
        for idx in 0..config.workers {
            let receiver = receiver.clone();
            let metrics = Arc::clone(&metrics);
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, idx))
                .spawn(move || Self::run_worker(receiver, metrics))
                .map_err(|e| {
                    LoggerError::io_operation("spawning dispatch worker", config.thread_name.clone(), e)
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            metrics,
            capacity: config.queue_capacity,
            overflow_policy: config.overflow_policy,
            on_overflow,
        })
    }

    /// Worker loop with per-job panic isolation
    fn run_worker(receiver: Receiver<Job>, metrics: Arc<DispatchMetrics>) {
        // Exits once every sender is gone and the queue is empty.
        while let Ok(job) = receiver.recv() {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
                Ok(()) => {
                    metrics.record_completed();
                }
                Err(panic_info) => {
                    metrics.record_panicked();
                    eprintln!(
                        "[LOGGER CRITICAL] Delivery job panicked: {}. \
                         Worker continues with the next job.",
                        panic_message(panic_info.as_ref())
                    );
                }
            }
        }
    }

    /// Queue a job for execution on a worker
    ///
    /// Returns an error when the job was dropped instead of queued; the job
    /// (and everything it captured) has been dropped by then.
    pub fn submit(&self, job: Job) -> Result<()> {
        let sender = match self.sender.lock().as_ref() {
            Some(sender) => sender.clone(),
            None => {
                self.metrics.record_dropped();
                return Err(LoggerError::DispatcherClosed);
            }
        };

        match sender.try_send(job) {
            Ok(()) => {
                self.metrics.record_submitted();
                Ok(())
            }
            Err(TrySendError::Full(job)) => self.handle_overflow(&sender, job),
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
                Err(LoggerError::DispatcherClosed)
            }
        }
    }

    /// Handle queue overflow based on the configured policy
    fn handle_overflow(&self, sender: &Sender<Job>, job: Job) -> Result<()> {
        self.metrics.record_queue_full();

        match self.overflow_policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
                Err(LoggerError::QueueFull {
                    current: sender.len(),
                    max: self.capacity,
                })
            }

            OverflowPolicy::Block => {
                self.metrics.record_block();
                match sender.send(job) {
                    Ok(()) => {
                        self.metrics.record_submitted();
                        Ok(())
                    }
                    Err(_) => {
                        self.metrics.record_dropped();
                        Err(LoggerError::DispatcherClosed)
                    }
                }
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(job, timeout) {
                    Ok(()) => {
                        self.metrics.record_submitted();
                        Ok(())
                    }
                    Err(SendTimeoutError::Timeout(job)) => self.alert_and_drop(sender, job),
                    Err(SendTimeoutError::Disconnected(_)) => {
                        self.metrics.record_dropped();
                        Err(LoggerError::DispatcherClosed)
                    }
                }
            }

            OverflowPolicy::AlertAndDrop => self.alert_and_drop(sender, job),
        }
    }

    /// Drop a job with alert notification
    fn alert_and_drop(&self, sender: &Sender<Job>, job: Job) -> Result<()> {
        drop(job);
        let dropped_count = self.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        let should_alert = dropped_count == 0 || (dropped_count + 1) % 1000 == 0;

        if should_alert {
            eprintln!(
                "[LOGGER WARNING] Dispatch queue full, {} deliveries dropped. \
                 Consider increasing queue capacity or using a different overflow policy.",
                dropped_count + 1
            );

            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count + 1);
            }
        }

        Err(LoggerError::QueueFull {
            current: sender.len(),
            max: self.capacity,
        })
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Jobs currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.sender.lock().as_ref().map(Sender::len).unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stop accepting jobs and wait for queued ones to finish
    ///
    /// Returns `true` if every worker exited within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        // Closing the channel lets workers drain the queue and exit
        drop(self.sender.lock().take());

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let start = Instant::now();
        let mut clean = true;
        let current = thread::current().id();

        for handle in handles {
            // Released from inside a job: this worker exits once the job returns
            if handle.thread().id() == current {
                continue;
            }

            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Dispatch worker panicked during shutdown: {:?}",
                            e
                        );
                        clean = false;
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Dispatch worker did not finish within {:?} timeout. \
                         Some logs may be lost.",
                        timeout
                    );
                    clean = false;
                    break;
                }

                // Small sleep to avoid busy-waiting
                thread::sleep(Duration::from_millis(10));
            }
        }

        clean
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capacity", &self.capacity)
            .field("overflow_policy", &self.overflow_policy)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if !self.workers.lock().is_empty() {
            self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Dispatcher shutting down with {} dropped deliveries (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}
