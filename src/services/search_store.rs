//! Observable search state for an interactive front end.
//!
//! A [`SearchStore`] owns a [`Debouncer`] and a driver task. The driver
//! reacts to committed queries by cancelling the previous query's pending
//! page, resetting the accumulation and loading page 1. It republishes the
//! [`SearchView`] whenever the search cache changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::Movie;
use crate::services::debounce::Debouncer;
use crate::services::fetch::{FetchError, FetchOutcome};
use crate::services::pagination::PaginationService;

/// Snapshot of the search state for the committed query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchView {
    /// The committed, normalized query. Empty until something is committed.
    pub query: String,
    pub results: Vec<Movie>,
    pub is_loading: bool,
    pub error: Option<FetchError>,
    pub has_more: bool,
    pub total_results: u64,
}

struct StoreInner {
    pagination: PaginationService,
    committed: Mutex<String>,
    /// Page loads requested per query that have not finished yet.
    pending_loads: Mutex<HashMap<String, usize>>,
    view: watch::Sender<SearchView>,
}

impl StoreInner {
    fn commit(self: &Arc<Self>, query: String) {
        let previous = std::mem::replace(&mut *self.committed.lock(), query.clone());
        if previous != query {
            self.pagination.cancel_pending(&previous);
        }

        if query.is_empty() {
            info!("Search cleared");
            self.publish();
            return;
        }

        self.pagination.reset(&query);
        self.spawn_load(query);
        self.publish();
    }

    fn spawn_load(self: &Arc<Self>, query: String) -> JoinHandle<FetchOutcome> {
        *self.pending_loads.lock().entry(query.clone()).or_default() += 1;

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let still_committed = *inner.committed.lock() == query;
            let outcome = if still_committed {
                inner.pagination.load_more(&query).await
            } else {
                debug!(query = %query, "Query no longer committed, not loading");
                FetchOutcome::Skipped
            };
            {
                let mut pending = inner.pending_loads.lock();
                if let Some(count) = pending.get_mut(&query) {
                    *count -= 1;
                    if *count == 0 {
                        pending.remove(&query);
                    }
                }
            }
            inner.publish();
            outcome
        })
    }

    fn snapshot(&self) -> SearchView {
        let query = self.committed.lock().clone();
        if query.is_empty() {
            return SearchView::default();
        }

        let Some(acc) = self.pagination.results(&query) else {
            return SearchView {
                is_loading: self.pending_loads.lock().contains_key(&query),
                query,
                has_more: true,
                ..SearchView::default()
            };
        };

        let pending = self.pagination.search().entry(&query, acc.next_page());
        let is_loading = pending.as_ref().is_some_and(|e| e.is_loading())
            || self.pending_loads.lock().contains_key(&query);
        let error = pending.as_ref().and_then(|e| e.current_error().cloned());

        let mut results = acc.movies().to_vec();
        let mut total_results = acc.total_results();

        // Keep showing the last known first page while it revalidates.
        if results.is_empty()
            && acc.next_page() == 1
            && let Some(stale) = pending.as_ref().and_then(|e| e.data.as_ref())
        {
            results.clone_from(&stale.results);
            total_results = stale.total_results;
        }

        SearchView {
            query,
            results,
            is_loading,
            error,
            has_more: acc.has_more(),
            total_results,
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Debounced, paginated search with an observable [`SearchView`].
///
/// Must be created inside a tokio runtime. Dropping the store stops its
/// driver task and any pending debounce timer.
pub struct SearchStore {
    debouncer: Debouncer,
    inner: Arc<StoreInner>,
    driver: JoinHandle<()>,
}

impl SearchStore {
    #[must_use]
    pub fn new(pagination: PaginationService, debounce: Duration) -> Self {
        let (debouncer, commits) = Debouncer::new(debounce);
        let (view, _) = watch::channel(SearchView::default());
        let cache_changes = pagination.search().cache().subscribe();

        let inner = Arc::new(StoreInner {
            pagination,
            committed: Mutex::new(String::new()),
            pending_loads: Mutex::new(HashMap::new()),
            view,
        });

        let driver = tokio::spawn(drive(Arc::clone(&inner), commits, cache_changes));

        Self {
            debouncer,
            inner,
            driver,
        }
    }

    /// Feeds one keystroke-level change of the search input.
    pub fn on_input_change(&self, raw: &str) {
        self.debouncer.on_input_change(raw);
    }

    /// Commits the pending input immediately.
    pub fn flush(&self) {
        self.debouncer.flush();
    }

    /// Requests the next page of the committed query.
    ///
    /// Returns a handle resolving to the outcome; it may be dropped without
    /// affecting the load.
    pub fn load_more(&self) -> JoinHandle<FetchOutcome> {
        let query = self.inner.committed.lock().clone();
        let handle = self.inner.spawn_load(query);
        self.inner.publish();
        handle
    }

    #[must_use]
    pub fn get(&self) -> SearchView {
        self.inner.view.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.inner.view.subscribe()
    }

    /// The last query the debouncer committed. The view catches up with it
    /// once the driver has applied it.
    #[must_use]
    pub fn latest_commit(&self) -> String {
        self.debouncer.last_committed()
    }

    /// The query the current view belongs to.
    #[must_use]
    pub fn committed_query(&self) -> String {
        self.inner.committed.lock().clone()
    }

    #[must_use]
    pub fn pagination(&self) -> &PaginationService {
        &self.inner.pagination
    }
}

impl Drop for SearchStore {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    inner: Arc<StoreInner>,
    mut commits: mpsc::UnboundedReceiver<String>,
    mut cache_changes: watch::Receiver<u64>,
) {
    loop {
        tokio::select! {
            query = commits.recv() => {
                let Some(query) = query else { break };
                debug!(query = %query, "Applying committed query");
                inner.commit(query);
            }
            changed = cache_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                inner.publish();
            }
        }
    }
    debug!("Search store driver stopped");
}
