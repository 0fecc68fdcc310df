//! SmallQuery Function Host Daemon
//!
//! The `smallqueryd` binary is the remote execution unit of SmallQuery. It:
//! - Opens the data bucket
//! - Serves the query and upload functions over the invocation protocol
//! - Handles graceful shutdown on SIGTERM/SIGINT
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! smallqueryd
//!
//! # Read and write an S3 bucket
//! smallqueryd --data-url s3://my-query-data
//!
//! # Start on custom port
//! smallqueryd --port 9001
//!
//! # Use configuration file
//! smallqueryd --config /etc/smallquery/smallqueryd.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use smallquery_server::config::ServerConfig;
use smallquery_server::functions::Functions;
use smallquery_server::http::HttpServer;

/// SmallQuery Function Host Daemon
#[derive(Parser, Debug)]
#[command(
    name = "smallqueryd",
    author = "SmallQuery Team",
    version,
    about = "SmallQuery function host",
    long_about = "SmallQuery runs SQL over files in a data bucket.\n\n\
                  This daemon hosts the query and upload functions the sq client invokes."
)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "SMALLQUERY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "SMALLQUERY_PORT")]
    port: Option<u16>,

    /// URL of the data bucket (s3://bucket, file:///dir or memory://)
    #[arg(short = 'd', long, value_name = "URL", env = "SMALLQUERY_DATA_URL")]
    data_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "SMALLQUERY_LOG_LEVEL")]
    log_level: String,

    /// Print configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    // Load configuration
    let config = load_config(&args)?;

    // Print config and exit if requested
    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    run_server(config).await
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_new(format!(
        "smallquery_server={level},smallqueryd={level},smallquery_common={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    // Start with defaults
    let mut config = if let Some(path) = &args.config {
        ServerConfig::from_file(path).context("Failed to load config file")?
    } else {
        ServerConfig::default()
    };

    // Override with command-line arguments
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = &args.data_url {
        config.data_url = url.clone();
    }

    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let functions = Functions::from_config(&config).context("Failed to open data bucket")?;
    let functions = Arc::new(functions);

    info!("SmallQuery v{}", env!("CARGO_PKG_VERSION"));
    info!("Server configuration:");
    info!("  Listen address: {}", config.listen_addr());
    info!("  Data bucket: {}", config.data_url);
    info!("  Log tail: {} bytes", config.log_tail_bytes);

    let server = HttpServer::new(functions, &config);

    info!("Press Ctrl+C to shutdown");

    tokio::select! {
        result = server.serve() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(anyhow::anyhow!("Server error: {}", e));
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server stopped. Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
