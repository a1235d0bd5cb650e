//! Charges API server
//!
//! Loads the trained pipeline artifact, then serves predictions over HTTP.

use anyhow::{Context, Result};
use charges_api::{load_artifact, start_server, ApiConfig, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "charges-api")]
#[command(author = "Charges Predictor Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Insurance charges prediction service", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override bind host
    #[arg(long)]
    host: Option<String>,

    /// Override bind port
    #[arg(long)]
    port: Option<u16>,

    /// Override model artifact path
    #[arg(long, value_name = "FILE")]
    model_path: Option<PathBuf>,

    /// Override static asset directory
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,

    /// Override the log level
    #[arg(long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// Select log output format
    #[arg(long, value_parser = ["pretty", "json"])]
    log_format: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ApiConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model_path) = self.model_path {
            config.model_path = model_path;
        }
        if let Some(static_dir) = self.static_dir {
            config.static_dir = static_dir;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ApiConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_logging(&config)?;

    info!("Charges API v{}", env!("CARGO_PKG_VERSION"));

    // The model must be in memory before the listener exists
    let artifact = load_artifact(&config.model_path)?;
    let state = AppState::from_artifact(artifact).with_static_dir(config.static_dir.clone());

    start_server(state, &config.bind_addr()).await
}

fn init_logging(config: &ApiConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to set tracing subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("Failed to set tracing subscriber")?;
    }

    Ok(())
}
