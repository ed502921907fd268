//! Single-flight, latest-wins request execution on top of [`QueryCache`].
//!
//! Each call to [`FetchCoordinator::run`] issues a new request id for its key.
//! When the response arrives it is only applied if that id is still the
//! entry's current one, so a slow response can never overwrite the outcome of
//! a request issued after it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::services::query_cache::{CacheEntry, QueryCache};

/// Failure of a catalog request, as recorded in a cache entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Catalog returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

impl FetchError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::NotFound(_) => "not_found",
            Self::Parse(_) => "parse",
            Self::Timeout(_) => "timeout",
            Self::Status { .. } => "status",
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// What became of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response settled the cache entry.
    Applied,
    /// The response arrived after a newer request for the same key was issued
    /// and was dropped.
    Superseded,
    /// The request was cancelled before a response arrived.
    Cancelled,
    /// A request for the same key was already in flight; nothing was issued.
    AlreadyLoading,
    /// Nothing to fetch (e.g. the empty query).
    Skipped,
}

impl FetchOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

struct InFlight {
    request_id: u64,
    cancel: CancellationToken,
}

pub struct FetchCoordinator<T> {
    cache: QueryCache<T>,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    timeout: Duration,
}

impl<T> Clone for FetchCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            in_flight: Arc::clone(&self.in_flight),
            timeout: self.timeout,
        }
    }
}

impl<T> FetchCoordinator<T> {
    #[must_use]
    pub fn new(cache: QueryCache<T>, timeout: Duration) -> Self {
        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache<T> {
        &self.cache
    }

    /// Runs `request` for `key` unless a request for that key is already in
    /// flight, then settles the entry if the response is still current.
    ///
    /// Dropping the returned future before it completes counts as a
    /// cancellation.
    pub async fn run<F, Fut>(&self, key: &str, request: F) -> FetchOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let Some(request_id) = self.cache.mutate(key, CacheEntry::begin) else {
            debug!(key, "Request already in flight, skipping");
            return FetchOutcome::AlreadyLoading;
        };

        let cancel = CancellationToken::new();
        let previous = self.in_flight.lock().insert(
            key.to_string(),
            InFlight {
                request_id,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let mut guard = PendingRequest {
            coordinator: self,
            key,
            request_id,
            armed: true,
        };

        debug!(key, request_id, "Issuing request");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = tokio::time::timeout(self.timeout, request()) => {
                Some(result.unwrap_or_else(|_| Err(FetchError::Timeout(self.timeout))))
            }
        };

        let Some(result) = result else {
            debug!(key, request_id, "Request cancelled");
            return FetchOutcome::Cancelled;
        };

        guard.disarm();
        self.release(key, request_id);

        if let Err(e) = &result {
            warn!(key, request_id, kind = e.kind(), "Request failed: {}", e);
        }

        if self
            .cache
            .mutate_if(key, |entry| entry.settle(request_id, result))
        {
            FetchOutcome::Applied
        } else {
            debug!(key, request_id, "Discarding superseded response");
            FetchOutcome::Superseded
        }
    }

    /// Cancels interest in `key`.
    ///
    /// Aborts the in-flight request if there is one and bumps the entry's
    /// request id, so a response that still arrives is treated as superseded.
    pub fn cancel(&self, key: &str) {
        if let Some(in_flight) = self.in_flight.lock().remove(key) {
            debug!(key, request_id = in_flight.request_id, "Cancelling request");
            in_flight.cancel.cancel();
        }
        self.cache.mutate_if(key, |entry| {
            entry.supersede();
            true
        });
    }

    /// Whether a request for `key` is currently in flight.
    #[must_use]
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    fn release(&self, key: &str, request_id: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(key)
            .is_some_and(|f| f.request_id == request_id)
        {
            in_flight.remove(key);
        }
    }

    fn abandon(&self, key: &str, request_id: u64) {
        self.release(key, request_id);
        self.cache.mutate_if(key, |entry| {
            if entry.request_id != request_id {
                return false;
            }
            entry.supersede();
            true
        });
    }
}

/// Releases the key if the request future is dropped before it resolves.
struct PendingRequest<'a, T> {
    coordinator: &'a FetchCoordinator<T>,
    key: &'a str,
    request_id: u64,
    armed: bool,
}

impl<T> PendingRequest<'_, T> {
    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for PendingRequest<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.abandon(self.key, self.request_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::query_cache::QueryStatus;
    use tokio::sync::oneshot;

    fn coordinator() -> FetchCoordinator<u32> {
        FetchCoordinator::new(QueryCache::new(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn applies_successful_response() {
        let fetch = coordinator();
        let outcome = fetch.run("k", || async { Ok(5) }).await;

        assert_eq!(outcome, FetchOutcome::Applied);
        let entry = fetch.cache().get("k").unwrap();
        assert_eq!(entry.status, QueryStatus::Success);
        assert_eq!(entry.data.as_deref(), Some(&5));
        assert!(entry.fetched_at.is_some());
        assert!(!fetch.is_in_flight("k"));
    }

    #[tokio::test]
    async fn records_typed_errors() {
        let fetch = coordinator();
        fetch
            .run("k", || async { Err(FetchError::NotFound("movie 1".into())) })
            .await;

        let entry = fetch.cache().get("k").unwrap();
        assert_eq!(entry.status, QueryStatus::Error);
        assert!(entry.current_error().unwrap().is_not_found());
        assert!(entry.data.is_none());
    }

    #[tokio::test]
    async fn concurrent_identical_requests_are_single_flight() {
        let fetch = coordinator();
        let (tx, rx) = oneshot::channel::<u32>();

        let first = fetch.run("k", || async move { Ok(rx.await.unwrap_or(0)) });
        let second = async {
            tokio::task::yield_now().await;
            fetch.run("k", || async { Ok(99) }).await
        };
        let release = async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            tx.send(1).unwrap();
        };

        let (first, second, ()) = tokio::join!(first, second, release);
        assert_eq!(first, FetchOutcome::Applied);
        assert_eq!(second, FetchOutcome::AlreadyLoading);
        assert_eq!(fetch.cache().get("k").unwrap().data.as_deref(), Some(&1));
    }

    #[tokio::test]
    async fn cancelled_request_never_lands() {
        let fetch = coordinator();
        let (_tx, rx) = oneshot::channel::<u32>();

        let pending = fetch.run("k", || async move { Ok(rx.await.unwrap_or(0)) });
        let cancel = async {
            tokio::task::yield_now().await;
            fetch.cancel("k");
        };

        let (outcome, ()) = tokio::join!(pending, cancel);
        assert_eq!(outcome, FetchOutcome::Cancelled);

        let entry = fetch.cache().get("k").unwrap();
        assert_eq!(entry.status, QueryStatus::Idle);
        assert!(entry.data.is_none());
        assert_eq!(entry.request_id, 2);
    }

    #[tokio::test]
    async fn late_response_after_cancel_is_superseded() {
        let fetch = coordinator();
        let fetch_ref = &fetch;

        // The transport can't be aborted: the response is ready in the same
        // poll that cancels it.
        let outcome = fetch_ref
            .run("k", || async move {
                fetch_ref.cancel("k");
                Ok(3)
            })
            .await;

        assert_eq!(outcome, FetchOutcome::Superseded);
        assert!(fetch.cache().get("k").unwrap().data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_resolve_to_timeout_errors() {
        let fetch = FetchCoordinator::new(QueryCache::new(), Duration::from_secs(10));
        let outcome = fetch
            .run("k", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1u32)
            })
            .await;

        assert_eq!(outcome, FetchOutcome::Applied);
        let entry = fetch.cache().get("k").unwrap();
        assert_eq!(
            entry.current_error(),
            Some(&FetchError::Timeout(Duration::from_secs(10)))
        );
    }

    #[tokio::test]
    async fn dropped_request_releases_the_key() {
        let fetch = coordinator();
        {
            let pending = fetch.run("k", || std::future::pending::<Result<u32, FetchError>>());
            tokio::pin!(pending);
            assert!(futures::poll!(pending.as_mut()).is_pending());
            assert!(fetch.is_in_flight("k"));
        }

        assert!(!fetch.is_in_flight("k"));
        assert_eq!(fetch.cache().get("k").unwrap().status, QueryStatus::Idle);
        assert_eq!(
            fetch.run("k", || async { Ok(4) }).await,
            FetchOutcome::Applied
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(10)).to_string(),
            "Request timed out after 10s"
        );
        assert_eq!(
            FetchError::Status {
                status: 401,
                message: "Invalid API key".into()
            }
            .to_string(),
            "Catalog returned HTTP 401: Invalid API key"
        );
        assert_eq!(FetchError::Parse("x".into()).kind(), "parse");
    }
}
