//! Criterion benchmarks for fanout_logger

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fanout_logger::backends::{ConsoleLogger, IndexClient, IndexLogger};
use fanout_logger::core::{
    DispatchCounter, DispatcherConfig, DrainBarrier, Handle, OverflowPolicy, Record,
};
use fanout_logger::prelude::*;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct DiscardClient;

impl IndexClient for DiscardClient {
    fn index(&self, _index: &str, document: &[u8]) -> Result<()> {
        black_box(document);
        Ok(())
    }
}

fn sink_console(threshold: Level, format: OutputFormat) -> ConsoleLogger {
    ConsoleLogger::builder()
        .threshold(threshold)
        .format(format)
        .writer(io::sink())
        .build()
}

fn index_logger(workers: usize) -> IndexLogger {
    IndexLogger::builder(Arc::new(DiscardClient))
        .dispatcher_config(DispatcherConfig {
            workers,
            queue_capacity: 16_384,
            overflow_policy: OverflowPolicy::Block,
            thread_name: "bench".to_string(),
        })
        .barrier(DrainBarrier::new(Duration::from_micros(200), None))
        .build()
        .expect("Failed to build index logger")
}

// ============================================================================
// Derivation Benchmarks
// ============================================================================

fn bench_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derivation");
    group.throughput(Throughput::Elements(1));

    let facade = LogFacade::builder()
        .backend(Arc::new(sink_console(Level::Debug, OutputFormat::Text)))
        .backend(Arc::new(NoopLogger))
        .build();

    group.bench_function("named", |b| {
        b.iter(|| black_box(facade.named(black_box("request"))));
    });

    group.bench_function("with_fields", |b| {
        let fields = [Field::new("request_id", "abc123"), Field::new("user_id", 42)];
        b.iter(|| black_box(facade.with(black_box(&fields))));
    });

    group.bench_function("attach", |b| {
        let ctx = Context::background();
        b.iter(|| black_box(facade.attach(&ctx)));
    });

    group.finish();
}

// ============================================================================
// Synchronous Fan-out Benchmarks
// ============================================================================

fn bench_sync_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_logging");
    group.throughput(Throughput::Elements(1));
    let ctx = Context::background();

    for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Logfmt] {
        let console = sink_console(Level::Debug, format);
        group.bench_with_input(
            BenchmarkId::new("console", format!("{:?}", format)),
            &console,
            |b, console| {
                b.iter(|| {
                    console.info(
                        &ctx,
                        black_box("request handled"),
                        &[Field::new("status", 200)],
                    )
                });
            },
        );
    }

    for backends in [1usize, 4, 8] {
        let mut builder = LogFacade::builder();
        for _ in 0..backends {
            builder = builder.backend(Arc::new(sink_console(Level::Debug, OutputFormat::Json)));
        }
        let facade = builder.build();

        group.bench_with_input(
            BenchmarkId::new("facade_backends", backends),
            &facade,
            |b, facade| {
                b.iter(|| facade.info(&ctx, black_box("fan-out"), &[]));
            },
        );
    }

    group.finish();
}

// ============================================================================
// Level Filtering Benchmarks
// ============================================================================

fn bench_level_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filtering");
    group.throughput(Throughput::Elements(1));
    let ctx = Context::background();

    let console = sink_console(Level::Error, OutputFormat::Text);

    group.bench_function("filtered_out", |b| {
        b.iter(|| console.debug(&ctx, black_box("filtered"), &[]));
    });

    group.bench_function("can_log", |b| {
        b.iter(|| can_log(black_box(Level::Warning), black_box(Level::Info)));
    });

    group.finish();
}

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let handle = Handle::with_name("api.auth").with(&[
        Field::new("service", "auth"),
        Field::new("version", "1.4.0"),
    ]);
    let record = Record::new(
        &handle,
        Level::Info,
        "user logged in",
        &[Field::new("user_id", 12345), Field::new("elapsed_ms", 3.5)],
    );

    for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Logfmt] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", format)),
            &format,
            |b, format| {
                b.iter(|| black_box(format.format(&record, &TimestampFormat::Iso8601)));
            },
        );
    }

    group.bench_function("record_resolve", |b| {
        let call = [Field::new("service", "override"), Field::new("user_id", 1)];
        b.iter(|| black_box(Record::new(&handle, Level::Info, "msg", &call)));
    });

    group.finish();
}

// ============================================================================
// Asynchronous Delivery Benchmarks
// ============================================================================

fn bench_async_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_logging");
    let ctx = Context::background();

    for workers in [1usize, 4] {
        let index = index_logger(workers);
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("log_1000_then_flush", workers),
            &index,
            |b, index| {
                b.iter(|| {
                    for i in 0..1000 {
                        index.info(&ctx, "queued", &[Field::new("i", i)]);
                    }
                    index.flush(&ctx).expect("Flush failed");
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");

    for threads in [2usize, 4, 8] {
        let facade = Arc::new(
            LogFacade::builder()
                .backend(Arc::new(index_logger(4)))
                .backend(Arc::new(sink_console(Level::Info, OutputFormat::Json)))
                .build(),
        );

        group.throughput(Throughput::Elements((threads * 100) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let facade = Arc::clone(&facade);
                        thread::spawn(move || {
                            let ctx = Context::background();
                            for i in 0..100 {
                                facade.info(&ctx, "concurrent", &[Field::new("t", t), Field::new("i", i)]);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("Producer panicked");
                }
                facade.flush(&Context::background()).expect("Flush failed");
            });
        });
    }

    group.finish();
}

// ============================================================================
// Drain Primitive Benchmarks
// ============================================================================

fn bench_dispatch_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_counter");
    group.throughput(Throughput::Elements(1));

    let counter = DispatchCounter::new();

    group.bench_function("accept_complete", |b| {
        b.iter(|| counter.accept().complete());
    });

    group.bench_function("idle_flush", |b| {
        let barrier = DrainBarrier::default();
        let ctx = Context::background();
        b.iter(|| barrier.wait(&counter, &ctx, &NoopLogger).expect("Flush failed"));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_derivation,
    bench_sync_logging,
    bench_level_filtering,
    bench_formatting,
    bench_async_logging,
    bench_concurrent_logging,
    bench_dispatch_counter,
);
criterion_main!(benches);
