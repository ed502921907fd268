//! Accumulation of successive result pages for one query.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::MovieId;
use crate::models::{Movie, ResultPage};
use crate::services::fetch::FetchOutcome;
use crate::services::search::SearchService;

/// Movies gathered for one normalized query, in page order, without
/// duplicate ids.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedResults {
    query: String,
    movies: Vec<Movie>,
    seen: HashSet<MovieId>,
    max_loaded_page: u32,
    total_pages: Option<u32>,
    total_results: u64,
    generation: u64,
}

impl AccumulatedResults {
    #[must_use]
    pub fn new(query: impl Into<String>, generation: u64) -> Self {
        Self {
            query: query.into(),
            generation,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    #[must_use]
    pub const fn max_loaded_page(&self) -> u32 {
        self.max_loaded_page
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.max_loaded_page + 1
    }

    #[must_use]
    pub const fn total_results(&self) -> u64 {
        self.total_results
    }

    #[must_use]
    pub const fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// True until a page has reported that it is the last one. Nothing loaded
    /// yet counts as more to load.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total_pages
            .is_none_or(|total| self.max_loaded_page < total)
    }

    /// Appends the items of page `page_number`, skipping ids already present.
    ///
    /// Pages must arrive in ascending order; a page at or below the highest
    /// loaded one is ignored. Returns the number of movies added.
    pub fn append(&mut self, page_number: u32, page: &ResultPage) -> usize {
        if page_number <= self.max_loaded_page {
            return 0;
        }

        let before = self.movies.len();
        for movie in &page.results {
            if self.seen.insert(movie.id) {
                self.movies.push(movie.clone());
            }
        }

        self.max_loaded_page = page_number;
        self.total_pages = Some(page.total_pages);
        self.total_results = page.total_results;

        let added = self.movies.len() - before;
        let skipped = page.results.len() - added;
        if skipped > 0 {
            debug!(
                query = %self.query,
                page = page_number,
                skipped,
                "Skipped movies already present on an earlier page"
            );
        }
        added
    }
}

/// Loads pages one after another for a query and merges them.
#[derive(Clone)]
pub struct PaginationService {
    search: SearchService,
    results: Arc<Mutex<HashMap<String, AccumulatedResults>>>,
    generations: Arc<AtomicU64>,
}

impl PaginationService {
    #[must_use]
    pub fn new(search: SearchService) -> Self {
        Self {
            search,
            results: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub const fn search(&self) -> &SearchService {
        &self.search
    }

    /// Starts a fresh accumulation for `normalized_query`.
    ///
    /// The page the previous accumulation was loading is cancelled, so the
    /// fresh one can request it again right away.
    pub fn reset(&self, normalized_query: &str) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.results.lock().insert(
            normalized_query.to_string(),
            AccumulatedResults::new(normalized_query, generation),
        );

        let pending_page = previous.map_or(1, |acc| acc.next_page());
        self.search.cancel(normalized_query, pending_page);
    }

    #[must_use]
    pub fn results(&self, normalized_query: &str) -> Option<AccumulatedResults> {
        self.results.lock().get(normalized_query).cloned()
    }

    /// Page that the next `load_more` would request.
    #[must_use]
    pub fn next_page(&self, normalized_query: &str) -> u32 {
        self.results
            .lock()
            .get(normalized_query)
            .map_or(1, AccumulatedResults::next_page)
    }

    /// Fetches the page after the highest one loaded and appends it.
    ///
    /// A no-op when that page is already loading, when the last page has
    /// been reached, or for the empty query.
    pub async fn load_more(&self, normalized_query: &str) -> FetchOutcome {
        if normalized_query.is_empty() {
            return FetchOutcome::Skipped;
        }

        let (page, generation) = {
            let mut results = self.results.lock();
            let acc = results
                .entry(normalized_query.to_string())
                .or_insert_with(|| {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
                    AccumulatedResults::new(normalized_query, generation)
                });
            if !acc.has_more() {
                debug!(query = normalized_query, "No more pages to load");
                return FetchOutcome::Skipped;
            }
            (acc.next_page(), acc.generation())
        };

        let outcome = self.search.search(normalized_query, page).await;
        if !outcome.is_applied() {
            return outcome;
        }

        let Some(data) = self
            .search
            .entry(normalized_query, page)
            .filter(|e| e.is_success())
            .and_then(|e| e.data)
        else {
            return outcome;
        };

        let mut results = self.results.lock();
        if let Some(acc) = results
            .get_mut(normalized_query)
            .filter(|acc| acc.generation() == generation)
        {
            let added = acc.append(page, &data);
            debug!(
                query = normalized_query,
                page,
                added,
                total = acc.movies().len(),
                has_more = acc.has_more(),
                "Appended page"
            );
        }

        outcome
    }

    /// Cancels the page currently being loaded for `normalized_query`.
    pub fn cancel_pending(&self, normalized_query: &str) {
        if normalized_query.is_empty() {
            return;
        }
        self.search
            .cancel(normalized_query, self.next_page(normalized_query));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64) -> Movie {
        Movie {
            id: MovieId::new(id),
            title: format!("Movie {id}"),
            poster_path: None,
            backdrop_path: None,
            release_date: None,
            vote_average: 0.0,
            vote_count: 0,
            overview: None,
        }
    }

    fn page(number: u32, ids: impl IntoIterator<Item = u64>, total_pages: u32) -> ResultPage {
        ResultPage {
            results: ids.into_iter().map(movie).collect(),
            page: number,
            total_pages,
            total_results: u64::from(total_pages) * 20,
        }
    }

    #[test]
    fn fresh_accumulation_expects_more() {
        let acc = AccumulatedResults::new("batman", 1);
        assert!(acc.has_more());
        assert_eq!(acc.next_page(), 1);
        assert!(acc.movies().is_empty());
    }

    #[test]
    fn append_concatenates_in_page_order() {
        let mut acc = AccumulatedResults::new("batman", 1);
        assert_eq!(acc.append(1, &page(1, 1..=20, 3)), 20);
        assert_eq!(acc.append(2, &page(2, 21..=40, 3)), 20);
        assert!(acc.has_more());
        assert_eq!(acc.append(3, &page(3, 41..=60, 3)), 20);

        assert_eq!(acc.movies().len(), 60);
        assert!(!acc.has_more());
        let ids: Vec<u64> = acc.movies().iter().map(|m| m.id.value()).collect();
        assert_eq!(ids, (1..=60).collect::<Vec<_>>());
    }

    #[test]
    fn append_skips_overlapping_ids() {
        let mut acc = AccumulatedResults::new("batman", 1);
        acc.append(1, &page(1, 1..=20, 2));
        let added = acc.append(2, &page(2, 18..=30, 2));

        assert_eq!(added, 10);
        assert_eq!(acc.movies().len(), 30);
    }

    #[test]
    fn append_ignores_pages_already_loaded() {
        let mut acc = AccumulatedResults::new("batman", 1);
        acc.append(1, &page(1, 1..=5, 2));
        assert_eq!(acc.append(1, &page(1, 100..=105, 2)), 0);
        assert_eq!(acc.movies().len(), 5);
        assert_eq!(acc.max_loaded_page(), 1);
    }

    #[test]
    fn empty_result_set_has_no_more_pages() {
        let mut acc = AccumulatedResults::new("zzzzqx", 1);
        acc.append(1, &page(1, [], 0));
        assert!(!acc.has_more());
        assert_eq!(acc.total_results(), 0);
    }
}
