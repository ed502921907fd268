use std::sync::Arc;

use crate::clients::MovieCatalog;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::models::{MovieDetail, ResultPage};
use crate::services::{DetailService, PaginationService, QueryCache, SearchService, SearchStore};

/// Build a shared HTTP client for catalog calls. Reused by every client so
/// connections are pooled.
fn build_shared_http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.catalog.request_timeout())
        .user_agent(config.catalog.user_agent.as_str())
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Everything a front end needs for one session: the catalog, both caches
/// and the services built on them.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub catalog: Arc<dyn MovieCatalog>,

    pub search_cache: QueryCache<ResultPage>,

    pub detail_cache: QueryCache<MovieDetail>,

    pub search_service: SearchService,

    pub pagination: PaginationService,

    pub detail_service: DetailService,
}

impl SharedState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(&config)?;
        let catalog = Arc::new(TmdbClient::with_shared_client(
            http_client,
            &config.catalog,
        )?);
        Ok(Self::with_catalog(config, catalog))
    }

    /// Builds the state around an arbitrary catalog implementation.
    #[must_use]
    pub fn with_catalog(config: Config, catalog: Arc<dyn MovieCatalog>) -> Self {
        let timeout = config.catalog.request_timeout();

        let search_cache = QueryCache::new();
        let detail_cache = QueryCache::new();

        let search_service =
            SearchService::new(Arc::clone(&catalog), search_cache.clone(), timeout);
        let pagination = PaginationService::new(search_service.clone());
        let detail_service =
            DetailService::new(Arc::clone(&catalog), detail_cache.clone(), timeout);

        Self {
            config: Arc::new(config),
            catalog,
            search_cache,
            detail_cache,
            search_service,
            pagination,
            detail_service,
        }
    }

    /// A new search store over the shared caches, using the configured
    /// debounce delay. Must be called inside a tokio runtime.
    #[must_use]
    pub fn search_store(&self) -> SearchStore {
        SearchStore::new(
            self.pagination.clone(),
            self.config.search.debounce_delay(),
        )
    }
}
