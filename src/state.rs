use std::sync::Arc;

use crate::clients::{EutilsClient, UpstreamSearch};
use crate::config::Config;
use crate::db::Store;
use crate::services::{CachedSearchService, SearchService, TracingObserver};

/// Build the HTTP client used for upstream calls.
/// Reused for every request so connections to E-utilities are pooled.
pub fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("entrez-cache/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub search_service: Arc<dyn SearchService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.eutils.request_timeout_seconds)?;
        let eutils: Arc<dyn UpstreamSearch> = Arc::new(
            EutilsClient::with_shared_client(http_client, &config.eutils)
                .map_err(|e| anyhow::anyhow!("Invalid E-utilities configuration: {e}"))?,
        );

        let search_service = Arc::new(
            CachedSearchService::new(
                eutils,
                Arc::new(store.clone()),
                Arc::new(TracingObserver),
            )
            .with_single_flight(config.cache.single_flight),
        ) as Arc<dyn SearchService>;

        Ok(Self {
            config,
            store,
            search_service,
        })
    }
}
