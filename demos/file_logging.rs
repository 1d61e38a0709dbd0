//! File logging example
//!
//! Demonstrates a facade built from JSON configuration that writes to both
//! the console and a file.
//!
//! Run with: cargo run --example file_logging

use fanout_logger::config::FacadeConfig;
use fanout_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Fanout Logger - File Logging Example ===\n");

    let config = FacadeConfig::from_json(
        r#"{
            "console": { "threshold": "info", "format": "text" },
            "file": { "path": "application.log", "threshold": "debug", "format": "json" }
        }"#,
    )?;
    let facade = config.build()?;
    let ctx = Context::background();

    println!("1. Logging to both console and file:");
    let db = facade.named("db").with(&[Field::new("pool", "primary")]);
    db.debug(&ctx, "opening connection (file only)", &[]);
    db.info(&ctx, "connected", &[Field::new("latency_ms", 12)]);
    db.warning(&ctx, "slow query", &[Field::new("elapsed", std::time::Duration::from_millis(850))]);

    println!("\n2. Swapping the console for logfmt output:");
    facade.replace_backend(
        "console",
        std::sync::Arc::new(
            fanout_logger::backends::ConsoleLogger::builder()
                .format(OutputFormat::Logfmt)
                .build(),
        ),
    );
    facade.info(&ctx, "now in logfmt", &[Field::new("backends", facade.len())]);

    facade.flush(&ctx)?;
    println!("\n   Check application.log for JSON lines");
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
