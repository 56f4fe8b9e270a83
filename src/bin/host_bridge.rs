//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Reads query and settings commands as newline-delimited JSON from stdin,
//! drives a [`cityscope::QueryController`], and writes every published search
//! state to stdout.
//!
//! Configuration is read from the TOML file named by `CITYSCOPE_CONFIG` when
//! set, otherwise defaults are used. API keys missing from the file are taken
//! from the environment.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::Path;

use anyhow::Context;
use cityscope::host::run_bridge;
use cityscope::{QueryController, SearchConfig};
use tokio::io::BufReader;

/// Environment variable naming the TOML config file.
const CONFIG_ENV: &str = "CITYSCOPE_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout is reserved for the JSON protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cityscope=info")),
        )
        .init();

    let config = load_config()?;
    let controller =
        QueryController::from_config(&config).context("invalid search configuration")?;

    tracing::info!(providers = ?config.providers, "cityscope-host starting");

    run_bridge(controller, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "cityscope-host exited with error");
            anyhow::anyhow!("cityscope-host failed: {e}")
        })?;

    tracing::info!("cityscope-host shut down cleanly");
    Ok(())
}

fn load_config() -> anyhow::Result<SearchConfig> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = Path::new(&path);
            tracing::info!(path = %path.display(), "loading config");
            SearchConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => SearchConfig::default(),
    };
    Ok(config.with_env_keys())
}
