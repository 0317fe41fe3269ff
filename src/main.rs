//! socksfwd - Minimal SOCKS5 CONNECT proxy
//!
//! This is the main entry point for the socksfwd application.

use anyhow::Result;
use clap::Parser;
use socksfwd::config::{listen_addr_from_port, load_config, Config};
use socksfwd::server::run_server;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// socksfwd - SOCKS5 proxy with optional reverse-proxy redirection
#[derive(Parser, Debug)]
#[command(name = "socksfwd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (`1080`, `:1080` or `host:port`)
    #[arg(short, long, env = "PORT")]
    port: Option<String>,

    /// Dial this target for every CONNECT instead of the requested one
    #[arg(short, long, env = "REVERSE_PROXY")]
    reverse_proxy: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let mut config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("Configuration loaded from: {:?}", path);
            config
        }
        None => Config::default(),
    };

    match &args.port {
        Some(port) => config.server.listen_addr = listen_addr_from_port(port),
        None if args.config.is_none() => info!("No port configured, using 1080"),
        None => {}
    }
    if let Some(target) = &args.reverse_proxy {
        config.server.reverse_proxy = Some(target.clone());
    }
    config.server.validate()?;

    info!("socksfwd v{}", socksfwd::VERSION);
    info!("Listen address: {}", config.server.listen_addr);
    if let Some(target) = config.server.reverse_proxy_target() {
        info!("Using reverse proxy {}", target);
    }

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C and termination signals (cross-platform)
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // On Windows, only handle Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }

        let _ = shutdown_tx_clone.send(true);
    });

    run_server(config, shutdown_rx).await
}

/// Setup logging based on configuration
///
/// `RUST_LOG` directives, when present, refine the `--log-level` default.
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}
