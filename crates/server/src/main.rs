//! armature server binary.

use anyhow::{Context, Result};
use armature_core::config::AppConfig;
use armature_inference::{HttpRigEngine, RigEngine};
use armature_server::{AppState, create_router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// armature - avatar auto-rigging and preview cache service
#[derive(Parser, Debug)]
#[command(name = "armatured")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ARMATURE_CONFIG", default_value = "armature.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("armature v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::path::Path::new(&args.config);
    let has_config_file = config_path.exists();
    let mut figment = Figment::new();
    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!(config_path = %args.config, "No configuration file found");
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("ARMATURE_") && key != "ARMATURE_CONFIG");
    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: armatured --config /path/to/armature.toml\n  \
             2. Environment variables: ARMATURE_INFERENCE__ENDPOINT=http://rigger:9000 armatured\n\n\
             At minimum, [inference].endpoint must be set."
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("ARMATURE_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    armature_server::metrics::register_metrics();

    // Fail startup on an unreachable backend rather than reporting healthy
    // and erroring on the first save.
    let storage = armature_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage backend")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend initialized");

    let metadata = armature_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    let rig_cache = Arc::new(
        armature_cache::RigCache::open(&config.cache.dir)
            .await
            .context("failed to open rig cache")?,
    );
    tracing::info!(
        dir = %config.cache.dir.display(),
        entries = rig_cache.len().await,
        "Rig cache opened"
    );

    let engine: Arc<dyn RigEngine> = Arc::new(
        HttpRigEngine::from_config(&config.inference)
            .context("failed to build inference client")?,
    );
    tracing::info!(endpoint = %config.inference.endpoint, "Inference engine configured");

    let state = AppState::new(config, storage, metadata, rig_cache, engine);

    if state.config.cache.auto_sweep {
        tokio::spawn(armature_server::sweep::run_cache_sweeper(state.clone()));
        tracing::info!(
            interval_secs = state.config.cache.sweep_interval_secs,
            ttl_secs = state.config.cache.ttl_secs,
            "Cache sweeper started"
        );
    } else {
        tracing::info!("Automatic cache sweeping disabled");
    }

    let app = create_router(state.clone());

    let addr: SocketAddr = state
        .config
        .server
        .bind
        .parse()
        .context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
