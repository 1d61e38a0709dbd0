//! Stress tests for concurrent logging and draining
//!
//! These tests verify:
//! - Every accepted delivery is counted exactly once under concurrency
//! - Dropped deliveries never leave the in-flight counter unbalanced
//! - Flushes racing with new logs terminate
//! - Derivation and attachment are safe from many threads

use fanout_logger::backends::{IndexClient, IndexLogger, NoopLogger};
use fanout_logger::core::{DispatcherConfig, DrainBarrier, OverflowPolicy};
use fanout_logger::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct CountingClient {
    delivered: AtomicUsize,
    delay: Option<Duration>,
}

impl IndexClient for CountingClient {
    fn index(&self, _index: &str, _document: &[u8]) -> Result<()> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn index_logger(
    client: Arc<CountingClient>,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
) -> IndexLogger {
    IndexLogger::builder(client)
        .dispatcher_config(DispatcherConfig {
            workers: 4,
            queue_capacity,
            overflow_policy,
            thread_name: "stress".to_string(),
        })
        .barrier(DrainBarrier::new(
            Duration::from_millis(2),
            Some(Duration::from_secs(30)),
        ))
        .build()
        .expect("Failed to build index logger")
}

/// All deliveries from many producers are drained by a single flush
#[test]
fn test_concurrent_logging_drains_completely() {
    let client = Arc::new(CountingClient::default());
    let index = Arc::new(index_logger(client.clone(), 1024, OverflowPolicy::Block));
    let facade = Arc::new(
        LogFacade::builder()
            .backend(index.clone())
            .backend(Arc::new(NoopLogger))
            .build(),
    );

    let threads = 8;
    let per_thread = 500;
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let facade = Arc::clone(&facade);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let ctx = Context::background();
                start.wait();
                for i in 0..per_thread {
                    facade.info(
                        &ctx,
                        "concurrent message",
                        &[Field::new("thread", t), Field::new("i", i)],
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Producer panicked");
    }

    facade.flush(&Context::background()).expect("Flush failed");
    assert_eq!(client.delivered.load(Ordering::SeqCst), threads * per_thread);
    assert_eq!(index.pending(), 0);
}

/// Overflow drops release their in-flight slot immediately
#[test]
fn test_dropped_deliveries_keep_counter_balanced() {
    let client = Arc::new(CountingClient {
        delay: Some(Duration::from_millis(2)),
        ..CountingClient::default()
    });
    let index = index_logger(client.clone(), 4, OverflowPolicy::DropNewest);
    let ctx = Context::background();

    for i in 0..200 {
        index.debug(&ctx, "flood", &[Field::new("i", i)]);
    }

    index.flush(&ctx).expect("Flush failed");
    assert_eq!(index.pending(), 0);

    let metrics = index.dispatcher().metrics();
    let delivered = client.delivered.load(Ordering::SeqCst) as u64;
    assert!(metrics.dropped_count() > 0, "Small queue should overflow");
    assert_eq!(delivered + metrics.dropped_count(), 200);
}

/// Flushing while producers keep logging terminates once they stop
#[test]
fn test_flush_races_with_producers() {
    let client = Arc::new(CountingClient::default());
    let index = Arc::new(index_logger(client.clone(), 256, OverflowPolicy::Block));
    let ctx = Context::background();

    let producer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            let ctx = Context::background();
            for i in 0..2000 {
                index.info(&ctx, "racing", &[Field::new("i", i)]);
            }
        })
    };

    // Intermediate flushes may finish early; none may hang or fail
    for _ in 0..5 {
        index
            .flush(&ctx.with_timeout(Duration::from_secs(30)))
            .expect("Intermediate flush failed");
    }

    producer.join().expect("Producer panicked");
    index.flush(&ctx).expect("Final flush failed");
    assert_eq!(client.delivered.load(Ordering::SeqCst), 2000);
}

/// Derived loggers and attached contexts from many threads
#[test]
fn test_concurrent_derivation_and_attachment() {
    let client = Arc::new(CountingClient::default());
    let facade = Arc::new(
        LogFacade::builder()
            .backend(Arc::new(index_logger(client.clone(), 1024, OverflowPolicy::Block)))
            .build(),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let facade = Arc::clone(&facade);
            thread::spawn(move || {
                for i in 0..50 {
                    let request = facade
                        .named("worker")
                        .with(&[Field::new("thread", t), Field::new("request", i)]);
                    let ctx = request.attach(&Context::background());
                    let logger = ctx.logger().expect("Logger should be attached");
                    logger.info(&ctx, "handled", &[]);
                    logger.flush(&ctx).expect("Request flush failed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Worker panicked");
    }

    assert_eq!(client.delivered.load(Ordering::SeqCst), 400);
}
