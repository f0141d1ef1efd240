//! Tracker ingest service binary
//!
//! Usage:
//!   tracker-ingest --config services/ingest_server/config/ingest.toml
//!   DB_HOST=db.internal tracker-ingest --port 4600 --json-logs

use anyhow::{Context, Result};
use clap::Parser;
use ingest_server::logging::{init_logging, with_bootstrap_logging};
use ingest_server::IngestServer;
use std::path::PathBuf;
use tracing::info;
use tracker_config::{IngestConfig, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "tracker-ingest")]
#[command(about = "Receives tracker telemetry frames and stores them in PostgreSQL")]
#[command(version)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive, overrides the configuration file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Listening port, overrides the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration loading logs through the command-line settings until the
    // configured subscriber is installed
    let bootstrap = bootstrap_logging(&args);
    let mut config = with_bootstrap_logging(&bootstrap, || IngestConfig::load(args.config.as_deref()))?
        .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    init_logging(&config.logging)?;

    info!("Starting tracker ingest v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.database);

    let server = IngestServer::connect(config).await?;
    let bound = server.bind().await?;

    bound
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await
}

fn bootstrap_logging(args: &Args) -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }
    logging.json = args.json_logs;
    logging
}

fn apply_overrides(config: &mut IngestConfig, args: &Args) {
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from(["tracker-ingest", "--port", "4600", "--json-logs", "-l", "debug"]);
        let mut config = IngestConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.listener.port, 4600);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_bootstrap_logging_follows_flags() {
        let args = Args::parse_from(["tracker-ingest", "--json-logs", "-l", "trace"]);
        let logging = bootstrap_logging(&args);
        assert_eq!(logging.level, "trace");
        assert!(logging.json);

        let defaults = bootstrap_logging(&Args::parse_from(["tracker-ingest"]));
        assert_eq!(defaults.level, "info");
        assert!(!defaults.json);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["tracker-ingest"]);
        let mut config = IngestConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.listener.port, 4500);
        assert!(!config.logging.json);
    }
}
