//! SmallQuery Command-Line Interface
//!
//! Runs SQL against files in your data bucket through the remote query
//! function.
//!
//! # Usage
//!
//! ```bash
//! # Run a single query
//! sq query -q "SELECT * FROM taxi" -l 20
//!
//! # Write the result to a CSV file
//! sq query -q "SELECT * FROM taxi" -o taxi.csv
//!
//! # Start interactive REPL
//! sq query -i
//!
//! # Copy public data into the bucket and name it
//! sq upload -f https://example.com/taxi_2019_04.parquet -t uploads/taxi_2019_04.parquet -n taxi
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use smallquery_client::Client;
use smallquery_common::DEFAULT_ROWS;

mod commands;
mod config;
mod formatter;
mod repl;

use config::CliConfig;
use repl::Repl;

/// SmallQuery command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "sq",
    author = "SmallQuery Team",
    version,
    about = "Command-line interface for SmallQuery",
    long_about = "Run SQL over files in your data bucket without managing a database.\n\n\
                  Queries are executed by a remote function; use `upload` to bring\n\
                  public data into the bucket and give it a friendly table name."
)]
struct Args {
    /// Function invocation endpoint
    #[arg(long, global = true, env = "SMALLQUERY_ENDPOINT")]
    endpoint: Option<String>,

    /// Data bucket URL holding uploads and the table mapping
    #[arg(long, global = true, env = "SMALLQUERY_BUCKET_URL")]
    bucket_url: Option<String>,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a SQL query
    Query {
        /// SQL query for execution
        #[arg(short = 'q', long, default_value = "")]
        query: String,

        /// Number of rows to return, max 1000
        #[arg(short = 'l', long, default_value_t = DEFAULT_ROWS as i64, allow_negative_numbers = true)]
        limit: i64,

        /// Interactive REPL
        #[arg(short = 'i', long)]
        interactive: bool,

        /// Output file (csv)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Upload data from a public URL into the data bucket
    Upload {
        /// From url
        #[arg(short = 'f', long)]
        from_url: String,

        /// Bucket path and filename
        #[arg(short = 't', long)]
        to: String,

        /// Friendly table name
        #[arg(short = 'n', long)]
        tablename: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            formatter::report_error(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose);

    // Load configuration
    let config = load_config(&args)?;
    let client = Client::new(config.client_config()).context("Failed to create client")?;

    match &args.command {
        Command::Query {
            query,
            limit,
            interactive,
            output,
        } => {
            if *interactive {
                let mut repl = Repl::new(&config, client)?;
                repl.run().await?;
                return Ok(true);
            }

            info!("Executing command: {}", query);
            commands::announce_query(query, *limit);
            Ok(commands::run_query(&client, query, *limit, output.as_deref()).await)
        }
        Command::Upload {
            from_url,
            to,
            tablename,
        } => Ok(commands::upload(&client, from_url, to, tablename.as_deref()).await),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sq=debug,smallquery_client=debug")
    } else {
        EnvFilter::new("sq=warn,smallquery_client=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    // Try to load from config file
    let mut config = if let Some(path) = &args.config {
        CliConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?
    } else {
        CliConfig::load_default()?
    };

    // Override with command line arguments
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(url) = &args.bucket_url {
        config.bucket_url = Some(url.clone());
    }

    Ok(config)
}
