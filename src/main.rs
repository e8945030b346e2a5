use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use noteling::cli::{self, Cli};
use noteling::{config, App};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    // Initialize the tracing subscriber for structured logging. Logs go to
    // stderr so command output stays clean; raise verbosity with RUST_LOG.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "noteling=warn".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    match env_file_path {
        Some(path) => debug!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found, using existing environment variables"),
    }

    let cli = Cli::parse();

    let mut config = config::load_config().await?;
    if let Some(api_url) = cli.api_url.clone() {
        config.api.base_url = api_url;
    }
    debug!(api_url = %config.api.base_url, "Configuration loaded");

    let app = App::from_config(config)?;
    cli::run(app, cli.command).await
}
