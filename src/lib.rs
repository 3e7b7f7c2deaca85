pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use cli::{Cli, Commands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::SearchRequest;
use crate::services::PipelineError;

/// Loads the configuration named on the command line, or the first one found
/// in the default locations.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let prometheus_handle = install_metrics_recorder(&config)?;
            run_server(config, prometheus_handle).await
        }
        Commands::Search {
            db,
            term,
            retmax,
            sort,
            field,
        } => {
            let request = SearchRequest {
                db: Some(db),
                query: Some(term.join(" ")),
                retmax,
                sort,
                field,
            };
            cmd_search(config, &request).await
        }
        Commands::Init => cmd_init(),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to initialize JSON logging")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}

fn install_metrics_recorder(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("entrez-cache v{} starting...", env!("CARGO_PKG_VERSION"));

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let single_flight = config.cache.single_flight;

    let api_state = api::create_app_state_from_config(config, prometheus_handle).await?;
    let app = api::router(api_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(address = %addr, single_flight, "Web server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn cmd_search(config: Config, request: &SearchRequest) -> anyhow::Result<()> {
    let descriptor = api::validate_search_request(request).map_err(|e| match e {
        api::ApiError::InvalidFields(errors) => {
            let lines: Vec<String> = errors
                .iter()
                .map(|e| format!("  {}: {}", e.field, e.message))
                .collect();
            anyhow::anyhow!("Invalid search:\n{}", lines.join("\n"))
        }
        other => anyhow::anyhow!(other.to_string()),
    })?;

    let shared = Arc::new(SharedState::new(config).await?);

    let resolution = match shared.search_service.resolve(&descriptor).await {
        Ok(resolution) => resolution,
        Err(err @ PipelineError::PersistenceFailed { .. }) => {
            error!("{err}");
            err.recovered()?
        }
        Err(PipelineError::NoResults) => {
            println!("No results for '{}' in {}", descriptor.term(), descriptor.database());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let source = if resolution.cache_hit { "cache" } else { "upstream" };
    info!(source, ids = resolution.result.id_list.len(), "Search resolved");

    println!("{}", serde_json::to_string_pretty(&resolution.result)?);
    Ok(())
}

fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings");
    } else {
        println!("config.toml already exists");
    }
    Ok(())
}
