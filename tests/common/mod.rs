//! In-memory catalog used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use cinesearch::clients::MovieCatalog;
use cinesearch::config::Config;
use cinesearch::domain::MovieId;
use cinesearch::models::{Movie, MovieDetail, ResultPage};
use cinesearch::services::FetchError;
use cinesearch::state::SharedState;

pub const PER_PAGE: u64 = 20;

struct QueryResults {
    first_id: u64,
    count: u64,
}

#[derive(Default)]
pub struct FakeCatalog {
    results: Mutex<HashMap<String, QueryResults>>,
    movies: Mutex<HashMap<MovieId, MovieDetail>>,
    delay: Mutex<Duration>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    failures: Mutex<VecDeque<FetchError>>,
    search_calls: Mutex<Vec<(String, u32)>>,
    detail_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `query` match `count` movies, 20 per page.
    pub fn with_results(&self, query: &str, count: u64) {
        let mut results = self.results.lock();
        let first_id = (results.len() as u64 + 1) * 10_000;
        results.insert(query.to_string(), QueryResults { first_id, count });
    }

    pub fn with_movie(&self, id: u64, title: &str) {
        let detail: MovieDetail = serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "runtime": 136,
            "genres": [{"id": 28, "name": "Action"}],
            "overview": "A test movie."
        }))
        .expect("valid detail");
        self.movies.lock().insert(MovieId::new(id), detail);
    }

    /// Every request sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// The next search call waits until the returned sender fires (or is
    /// dropped).
    pub fn gate_next_search(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push_back(rx);
        tx
    }

    pub fn fail_next_search(&self, error: FetchError) {
        self.failures.lock().push_back(error);
    }

    pub fn search_calls(&self) -> Vec<(String, u32)> {
        self.search_calls.lock().clone()
    }

    pub fn search_call_count(&self) -> usize {
        self.search_calls.lock().len()
    }

    pub fn detail_call_count(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    fn page(&self, query: &str, page: u32) -> ResultPage {
        let results = self.results.lock();
        let Some(q) = results.get(query) else {
            return ResultPage {
                results: Vec::new(),
                page,
                total_pages: 0,
                total_results: 0,
            };
        };

        let start = u64::from(page - 1) * PER_PAGE;
        let end = (start + PER_PAGE).min(q.count);
        let movies = (start..end)
            .map(|i| Movie {
                id: MovieId::new(q.first_id + i),
                title: format!("{query} #{}", i + 1),
                poster_path: None,
                backdrop_path: None,
                release_date: Some("2008-07-16".into()),
                vote_average: 7.5,
                vote_count: 100,
                overview: None,
            })
            .collect();

        ResultPage {
            results: movies,
            page,
            total_pages: u32::try_from(q.count.div_ceil(PER_PAGE)).expect("page count"),
            total_results: q.count,
        }
    }

    async fn wait_turn(&self) {
        let gate = self.gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MovieCatalog for FakeCatalog {
    async fn search_movies(&self, query: &str, page: u32) -> Result<ResultPage, FetchError> {
        self.search_calls.lock().push((query.to_string(), page));
        self.wait_turn().await;

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.page(query, page))
    }

    async fn movie_detail(&self, id: MovieId) -> Result<MovieDetail, FetchError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_turn().await;

        self.movies
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("movie {id}")))
    }
}

pub fn state_with(catalog: &Arc<FakeCatalog>) -> SharedState {
    let catalog: Arc<dyn MovieCatalog> = catalog.clone();
    SharedState::with_catalog(Config::default(), catalog)
}
