//! Per-movie detail fetching with cache reuse.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::clients::MovieCatalog;
use crate::domain::MovieId;
use crate::models::MovieDetail;
use crate::services::fetch::{FetchCoordinator, FetchError, FetchOutcome};
use crate::services::query_cache::{CacheEntry, QueryCache};

/// What a detail consumer renders for one movie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailView {
    pub data: Option<Arc<MovieDetail>>,
    pub is_loading: bool,
    pub error: Option<FetchError>,
}

impl From<&CacheEntry<MovieDetail>> for DetailView {
    fn from(entry: &CacheEntry<MovieDetail>) -> Self {
        Self {
            data: entry.data.clone(),
            is_loading: entry.is_loading(),
            error: entry.current_error().cloned(),
        }
    }
}

/// Observable detail state, one entry per movie.
pub type DetailStore = DetailService;

/// Fetches movie details on demand, one cache entry per movie id.
///
/// A movie that was already fetched successfully is served from the cache
/// without contacting the catalog. A failed fetch is retried on the next
/// request.
#[derive(Clone)]
pub struct DetailService {
    catalog: Arc<dyn MovieCatalog>,
    fetch: FetchCoordinator<MovieDetail>,
}

impl DetailService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        cache: QueryCache<MovieDetail>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            fetch: FetchCoordinator::new(cache, timeout),
        }
    }

    /// Fetches the detail for `id` unless it is already cached, and returns
    /// the resulting entry.
    pub async fn get_detail(&self, id: MovieId) -> CacheEntry<MovieDetail> {
        let key = id.cache_key();

        if let Some(entry) = self.fetch.cache().get(&key).filter(CacheEntry::is_success) {
            debug!(%id, "Movie detail served from cache");
            return entry;
        }

        self.fetch_detail(id).await;
        self.fetch
            .cache()
            .get(&key)
            .unwrap_or_else(|| CacheEntry::new(key))
    }

    async fn fetch_detail(&self, id: MovieId) -> FetchOutcome {
        let catalog = Arc::clone(&self.catalog);
        let outcome = self
            .fetch
            .run(&id.cache_key(), || async move { catalog.movie_detail(id).await })
            .await;

        debug!(%id, ?outcome, "Movie detail fetch finished");
        outcome
    }

    /// Fetches the detail for `id` if needed and returns the resulting view.
    ///
    /// If another caller is already fetching the same id this returns a
    /// loading view at once; use [`DetailService::settled`] to wait for it.
    pub async fn use_movie_detail(&self, id: MovieId) -> DetailView {
        DetailView::from(&self.get_detail(id).await)
    }

    /// Current view for `id` without fetching anything.
    #[must_use]
    pub fn get(&self, id: MovieId) -> DetailView {
        self.entry(id)
            .as_ref()
            .map(DetailView::from)
            .unwrap_or_default()
    }

    /// Waits until the entry for `id` is no longer loading.
    pub async fn settled(&self, id: MovieId) -> DetailView {
        let mut changes = self.subscribe();
        loop {
            let view = self.get(id);
            if !view.is_loading || changes.changed().await.is_err() {
                return view;
            }
        }
    }

    #[must_use]
    pub fn entry(&self, id: MovieId) -> Option<CacheEntry<MovieDetail>> {
        self.fetch.cache().get(&id.cache_key())
    }

    /// Cancels the in-flight fetch for `id`, if any.
    pub fn cancel(&self, id: MovieId) {
        self.fetch.cancel(&id.cache_key());
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.fetch.cache().subscribe()
    }
}
