//! Sweep CLI tool
//!
//! Applies one bulk operation (recreate, upgrade or an errand run) to every
//! service instance of an offering, as described by a YAML config file.
//!
//! Progress lines go to stdout; structured logs go to stderr. Exits `0`
//! only when every instance succeeded.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sweep_core::{IteratorConfig, StatusSource};
use sweep_director::{BrokerClient, DirectorClient, InventoryClient};
use sweep_runtime::{
    BulkOperationOrchestrator, Collaborators, DirectorStatusChecker, LastOperationChecker,
    OperationTrigger, Reporter, StatusChecker,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod shutdown;

#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(author, version, about = "Bulk operations across service instances", long_about = None)]
struct Cli {
    /// Path to the run's YAML config
    #[arg(long = "config-path", alias = "configPath", env = "SWEEP_CONFIG_PATH")]
    config_path: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Bulk operation aborted");
            1
        }
    };

    std::process::exit(code);
}

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose { "sweep=debug" } else { "sweep=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = IteratorConfig::load(&cli.config_path)
        .with_context(|| format!("Failed to load config from {}", cli.config_path.display()))?;

    info!(
        operation = ?config.operation,
        offering = %config.service_offering,
        max_in_flight = config.max_in_flight,
        bosh_url = %config.bosh.url,
        bosh_user = %config.bosh.username(),
        status_source = ?config.status_source,
        "Configuration loaded"
    );

    let collaborators = collaborators(&config)?;
    let run_name = OperationTrigger::from_config(&config).run_name();

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown::shutdown_signal().await;
        signal_cancel.cancel();
    });

    let orchestrator =
        BulkOperationOrchestrator::new(&config, collaborators, Reporter::stdout(run_name))
            .with_cancellation(cancel);

    let report = orchestrator.run().await?;
    Ok(report.exit_code())
}

fn collaborators(config: &IteratorConfig) -> anyhow::Result<Collaborators> {
    let director =
        Arc::new(DirectorClient::new(config).context("Failed to create director client")?);
    let inventory =
        Arc::new(InventoryClient::new(config).context("Failed to create inventory client")?);

    let status: Arc<dyn StatusChecker> = match config.status_source {
        StatusSource::Director => Arc::new(DirectorStatusChecker::new(director.clone())),
        StatusSource::Broker => Arc::new(LastOperationChecker::new(Arc::new(
            BrokerClient::new(config).context("Failed to create broker client")?,
        ))),
    };

    Ok(Collaborators {
        inventory,
        director,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_flag() {
        let cli = Cli::try_parse_from(["sweep", "--config-path", "/tmp/recreate-all.yml"]).unwrap();
        assert_eq!(cli.config_path, PathBuf::from("/tmp/recreate-all.yml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_config_path_camel_case_alias() {
        let cli = Cli::try_parse_from(["sweep", "--configPath", "cfg.yml", "-v"]).unwrap();
        assert_eq!(cli.config_path, PathBuf::from("cfg.yml"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_config_path_is_required() {
        std::env::remove_var("SWEEP_CONFIG_PATH");
        assert!(Cli::try_parse_from(["sweep"]).is_err());
    }
}
