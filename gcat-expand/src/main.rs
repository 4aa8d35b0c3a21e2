//! gcat-expand - catalog layer expansion
//!
//! Reads a dataset catalog, expands every record that points at a root
//! ArcGIS REST service into one record per concrete sublayer, and either
//! prints the result (dry run, the default) or writes it back atomically.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gcat_common::catalog::{load_catalog, write_catalog};
use gcat_common::config::{load_config, ExpandSection};
use gcat_expand::scheduler::BatchScheduler;
use gcat_expand::{ArcGisClient, ExpandConfig, Expander};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "gcat_expand=info,gcat_common=info";

/// Command-line arguments for gcat-expand
#[derive(Parser, Debug)]
#[command(name = "gcat-expand")]
#[command(about = "Expand root ArcGIS service records of a dataset catalog into per-layer records")]
#[command(version)]
struct Args {
    /// Catalog JSON document (top-level `datasets` array)
    catalog: PathBuf,

    /// Persist the result (default is a dry run printing to stdout)
    #[arg(long)]
    write: bool,

    /// Write the result here instead of over the input (implies --write)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "GCAT_CONFIG")]
    config: Option<PathBuf>,

    /// Concurrent expansions per batch
    #[arg(long, env = "GCAT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Additional attempts after a failed request
    #[arg(long)]
    retries: Option<u32>,

    /// Pause between batches in milliseconds
    #[arg(long)]
    batch_delay_ms: Option<u64>,

    /// Identifying User-Agent header
    #[arg(long, env = "GCAT_USER_AGENT")]
    user_agent: Option<String>,
}

impl Args {
    fn overrides(&self) -> ExpandSection {
        ExpandSection {
            request_timeout_secs: self.timeout_secs,
            max_retries: self.retries,
            retry_backoff_ms: None,
            concurrency: self.concurrency,
            batch_delay_ms: self.batch_delay_ms,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = load_config(args.config.as_deref()).context("Failed to load config")?;

    // Initialize tracing
    let default_filter = file_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ExpandConfig::resolve(&file_config.expand, &args.overrides())
        .context("Invalid configuration")?;

    info!("Starting gcat-expand {}", env!("CARGO_PKG_VERSION"));
    info!(
        concurrency = config.concurrency,
        timeout_ms = config.request_timeout.as_millis() as u64,
        retries = config.max_retries,
        "Configuration resolved"
    );

    // Unreadable catalog aborts before any discovery work
    let catalog = load_catalog(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;

    let client = ArcGisClient::new(&config).context("Failed to create HTTP client")?;
    let expander = Expander::new(Arc::new(client));
    let scheduler = BatchScheduler::new(&config);

    let report = gcat_expand::run(&catalog.datasets, &expander, &scheduler).await;

    report.log();

    let mut result = catalog;
    result.datasets = report.records;

    let target = match (&args.output, args.write) {
        (Some(output), _) => Some(output.clone()),
        (None, true) => Some(args.catalog.clone()),
        (None, false) => None,
    };

    match target {
        Some(path) => {
            write_catalog(&result, &path)
                .with_context(|| format!("Failed to write catalog {}", path.display()))?;
        }
        None => {
            info!("Dry run: catalog not written");
            print!("{}", result.to_json_string()?);
        }
    }

    Ok(())
}
