//! Switchyard Server - HTTP host for the action dispatcher.
//!
//! This binary owns the listening socket, registers the built-in handlers,
//! and forwards every `/action` request to the dispatcher.

mod handlers;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use switchyard::{Dispatcher, HandlerRegistry};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "switchyard-server")]
#[command(about = "HTTP host for the Switchyard action dispatcher")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Site root pushed into every handler (defaults to the current directory)
    #[arg(long)]
    site_root: Option<PathBuf>,

    /// Maximum number of requests handled at once
    #[arg(long, default_value = "64")]
    max_concurrency: usize,

    /// Module manifest naming the module the built-in handlers belong to
    #[arg(long)]
    module_manifest: Option<PathBuf>,
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Switchyard server");

    let site_root = match args.site_root {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    info!("Site root: {}", site_root.display());

    // Discovery: the host decides which handlers exist
    let registry = Arc::new(HandlerRegistry::new());
    let loaded = registry.register_from(&handlers::BuiltinHandlers::new(args.module_manifest.clone()));
    info!("Registered {} handlers", loaded);

    let dispatcher =
        Dispatcher::new(Arc::clone(&registry)).with_site_root(site_root.to_string_lossy());

    let (addr, server_task) = server::start_server(
        dispatcher,
        &args.host,
        args.port,
        args.max_concurrency,
        shutdown_signal(),
    )
    .await?;

    // Print port for the parent process to read (intentional stdout for IPC)
    println!("SWITCHYARD_PORT={}", addr.port());

    info!("Server running on {}", addr);

    // In-flight requests finish before any handler is released
    server_task.await.context("Server task failed")?;
    info!("Releasing handlers");

    let report = registry.shutdown();
    info!(
        "Released {} handlers, {} failed",
        report.released,
        report.failed.len()
    );

    Ok(())
}
