use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clients::MovieCatalog;
use crate::domain::search_key;
use crate::models::ResultPage;
use crate::services::fetch::{FetchCoordinator, FetchOutcome};
use crate::services::query_cache::{CacheEntry, QueryCache};

/// Issues search-page requests, one cache entry per (query, page).
#[derive(Clone)]
pub struct SearchService {
    catalog: Arc<dyn MovieCatalog>,
    fetch: FetchCoordinator<ResultPage>,
}

impl SearchService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        cache: QueryCache<ResultPage>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            fetch: FetchCoordinator::new(cache, timeout),
        }
    }

    /// Fetches `page` of `normalized_query` into the cache.
    ///
    /// A no-op if that page is already loading. The empty query is never sent
    /// to the catalog.
    pub async fn search(&self, normalized_query: &str, page: u32) -> FetchOutcome {
        if normalized_query.is_empty() {
            return FetchOutcome::Skipped;
        }

        let key = search_key(normalized_query, page);
        let catalog = Arc::clone(&self.catalog);
        let query = normalized_query.to_string();

        let outcome = self
            .fetch
            .run(&key, || async move { catalog.search_movies(&query, page).await })
            .await;

        debug!(query = normalized_query, page, ?outcome, "Search finished");
        outcome
    }

    /// Cancels interest in one page of a query.
    pub fn cancel(&self, normalized_query: &str, page: u32) {
        self.fetch.cancel(&search_key(normalized_query, page));
    }

    #[must_use]
    pub fn entry(&self, normalized_query: &str, page: u32) -> Option<CacheEntry<ResultPage>> {
        self.fetch.cache().get(&search_key(normalized_query, page))
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache<ResultPage> {
        self.fetch.cache()
    }
}
