//! Offchain gateway daemon
//!
//! Loads configuration, resolves credentials and serves the gateway API.
//! Any failure to load a key or bearer token aborts startup.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use oc_lib::{DefaultSecretResolver, ServerConfig};
use oc_server::{create_router, ApiState, ExchangeRegistry};

#[derive(Parser)]
#[command(name = "oc-server")]
#[command(author, version, about = "Offchain exchange gateway", long_about = None)]
struct Args {
    /// Path to the configuration file (.toml or .json); defaults to $OFFCHAIN_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(long)]
    listen: Option<String>,

    /// Serve read endpoints without credentials
    #[arg(long)]
    public_read_endpoints: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let path = ServerConfig::resolve_path(self.config.clone())?;
        let mut config = ServerConfig::load_from_path(&path)
            .with_context(|| format!("could not read configuration {}", path.display()))?;

        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if self.public_read_endpoints {
            config.public_read_endpoints = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.clone())
        .init();

    let config = args.load_config()?;

    tracing::info!("Starting offchain gateway");
    tracing::info!("Public read endpoints: {}", config.public_read_endpoints);

    let authenticator = config
        .build_authenticator(&DefaultSecretResolver)
        .await
        .context("failed to load credentials")?;
    tracing::info!(
        "Loaded {} bearer tokens and {} public keys",
        authenticator.bearer_token_count(),
        authenticator.verifier_count()
    );

    let exchanges = ExchangeRegistry::from_config(&config);
    tracing::info!("Configured {} exchanges", exchanges.len());

    let app = create_router(ApiState::new(authenticator, exchanges));

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!("Gateway listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
