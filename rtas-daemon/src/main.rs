use anyhow::Result;
use clap::Parser;

use rtas_daemon::cli::{DaemonCli, LoadedConfig};
use rtas_daemon::logging::init_tracing;
use rtas_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let LoadedConfig {
        config,
        ignored_env,
    } = cli
        .load_config()
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", cli.config.display()))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "kube-rtas starting"
    );
    for var in &ignored_env {
        tracing::warn!(var = var.as_str(), "ignored unparsable environment override");
    }

    let mut orchestrator = match Orchestrator::build_from_config(config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return Err(e);
        }
    };

    orchestrator.run().await
}
