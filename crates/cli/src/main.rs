//! Token price proxy
//!
//! Main entry point for the command-line front end

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pricing_cli::{commands, Args, Command};
use pricing_core::ProxyConfig;
use pricing_feed::PriceAggregator;

fn init_logging(args: &Args) {
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // stdout carries the JSON result, so logs go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args);

    info!("Starting price proxy v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = ProxyConfig::from_env()?;
    if let Some(timeout_ms) = args.timeout_ms {
        config.source_timeout_ms = timeout_ms;
        config.validate()?;
    }
    info!(
        "Source timeout {}ms, credentials: {:?}",
        config.source_timeout_ms, config.credentials
    );

    let aggregator = PriceAggregator::from_config(&config);

    let output = match args.command {
        Command::Price {
            token,
            chain,
            timestamp,
            search_width,
        } => commands::price(&aggregator, token, chain, timestamp, search_width).await,
        Command::Health { family } => commands::health(&aggregator, family).await,
        Command::Chains => Ok(commands::chains()),
    };

    match output {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(e)
        }
    }
}
