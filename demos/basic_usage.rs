//! Basic facade usage
//!
//! Demonstrates a console backend, per-backend levels, derived loggers and the
//! logging macros.
//!
//! Run with: cargo run --example basic_usage

use fanout_logger::backends::ConsoleLogger;
use fanout_logger::prelude::*;
use fanout_logger::{info, warning};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Fanout Logger - Basic Usage Example ===\n");

    let facade = LogFacade::builder()
        .backend(Arc::new(ConsoleLogger::new()))
        .build();
    let ctx = Context::background();

    println!("1. Logging at different levels:");
    facade.debug(&ctx, "This is a debug message", &[]);
    facade.info(&ctx, "This is an info message", &[]);
    facade.warning(&ctx, "This is a warning message", &[]);
    facade.error(&ctx, "This is an error message", &[]);

    println!("\n2. Per-backend threshold set to WARNING:");
    let quiet = LogFacade::builder()
        .backend(Arc::new(
            ConsoleLogger::builder()
                .threshold(Level::Warning)
                .format(OutputFormat::Logfmt)
                .build(),
        ))
        .build();
    quiet.info(&ctx, "Info message (hidden)", &[]);
    quiet.warning(&ctx, "Warning message (visible)", &[]);

    println!("\n3. Derived loggers:");
    let api = facade
        .named("api")
        .with(&[Field::new("version", "1.4.0")]);
    api.named("auth")
        .info(&ctx, "user logged in", &[Field::new("user_id", 42)]);

    println!("\n4. Macros:");
    let port = 8080;
    info!(api, &ctx, "listening on port {}", port);
    warning!(api, &ctx, "slow request"; "elapsed_ms" => 1250, "path" => "/search");

    facade.flush(&ctx)?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
