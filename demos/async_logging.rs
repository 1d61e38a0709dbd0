//! Asynchronous delivery example
//!
//! Demonstrates an index backend whose deliveries run on a worker pool, and a
//! flush that drains them with a timeout and with cancellation.
//!
//! Run with: cargo run --example async_logging

use fanout_logger::backends::{ConsoleLogger, IndexClient, IndexLogger};
use fanout_logger::core::{DispatcherConfig, DrainBarrier};
use fanout_logger::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pretends to be a slow search index
#[derive(Default)]
struct SlowIndex {
    documents: AtomicUsize,
}

impl IndexClient for SlowIndex {
    fn index(&self, index: &str, document: &[u8]) -> Result<()> {
        thread::sleep(Duration::from_millis(5));
        let n = self.documents.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 50 == 0 {
            println!("   [{}] {} documents, last: {} bytes", index, n, document.len());
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("=== Fanout Logger - Async Delivery Example ===\n");

    let client = Arc::new(SlowIndex::default());
    let diagnostics: SharedLogger = Arc::new(
        ConsoleLogger::builder()
            .name("diagnostics")
            .threshold(Level::Info)
            .build(),
    );

    let index = IndexLogger::builder(client.clone())
        .index_name_builder(|event| format!("logs-{}", event.level.to_str().to_lowercase()))
        .dispatcher_config(DispatcherConfig {
            workers: 4,
            ..DispatcherConfig::default()
        })
        .barrier(DrainBarrier::new(Duration::from_millis(20), None))
        .diagnostics(diagnostics)
        .build()?;
    let facade = LogFacade::builder().backend(Arc::new(index)).build();
    let ctx = Context::background();

    println!("1. Logging from several threads:");
    let facade = Arc::new(facade);
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let facade = Arc::clone(&facade);
            thread::spawn(move || {
                let ctx = Context::background();
                let worker = facade.named("worker").with(&[Field::new("thread", t)]);
                for i in 0..50 {
                    worker.info(&ctx, "processed item", &[Field::new("item", i)]);
                }
                // Each derived facade tracks its own deliveries
                if let Err(e) = worker.flush(&ctx) {
                    println!("   thread {}: {}", t, e);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
    println!(
        "   Delivered {} documents",
        client.documents.load(Ordering::SeqCst)
    );

    println!("\n2. Flush with a short deadline:");
    for i in 0..100 {
        facade.info(&ctx, "batch item", &[Field::new("item", i)]);
    }
    match facade.flush(&ctx.with_timeout(Duration::from_millis(10))) {
        Ok(()) => println!("   Drained before the deadline"),
        Err(e) => println!("   {}", e),
    }

    println!("\n3. Flush cancelled from another thread:");
    for i in 0..100 {
        facade.warning(&ctx, "retrying item", &[Field::new("item", i)]);
    }
    let (flush_ctx, cancel) = ctx.with_cancel();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        cancel.cancel();
    });
    if let Err(e) = facade.flush(&flush_ctx) {
        println!("   {}", e);
    }
    canceller.join().expect("canceller panicked");

    println!("\n4. Final flush:");
    facade.flush(&ctx)?;
    println!(
        "   Delivered {} documents",
        client.documents.load(Ordering::SeqCst)
    );

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
