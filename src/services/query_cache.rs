//! Session-scoped key/value cache for fetched catalog data.
//!
//! Entries are created lazily on first use and are never evicted. Every entry
//! follows the state machine `idle → loading → {success, error}` and can go
//! back to `loading` on a refetch while keeping its previous payload.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::services::fetch::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// State of one cache key.
///
/// `request_id` identifies the most recently issued request for the key. Only
/// a response carrying that id may settle the entry.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub key: String,
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<FetchError>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub request_id: u64,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            updated_at: self.updated_at,
            request_id: self.request_id,
        }
    }
}

impl<T> CacheEntry<T> {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: QueryStatus::Idle,
            data: None,
            error: None,
            fetched_at: None,
            updated_at: Utc::now(),
            request_id: 0,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Error of the last settled request, only while the entry is in the
    /// error state.
    #[must_use]
    pub fn current_error(&self) -> Option<&FetchError> {
        if self.status == QueryStatus::Error {
            self.error.as_ref()
        } else {
            None
        }
    }

    /// Moves the entry to `loading` and issues a new request id.
    ///
    /// Returns `None` if a request is already in flight. Payload and error are
    /// kept so the previous result stays visible until the new one lands.
    pub fn begin(&mut self) -> Option<u64> {
        if self.is_loading() {
            return None;
        }
        self.request_id += 1;
        self.status = QueryStatus::Loading;
        self.updated_at = Utc::now();
        Some(self.request_id)
    }

    /// Applies a response issued under `request_id`.
    ///
    /// Returns `false` without touching anything when a newer request has been
    /// issued since.
    pub fn settle(&mut self, request_id: u64, result: Result<T, FetchError>) -> bool {
        if request_id != self.request_id {
            return false;
        }

        let now = Utc::now();
        match result {
            Ok(data) => {
                self.status = QueryStatus::Success;
                self.data = Some(Arc::new(data));
                self.error = None;
            }
            Err(err) => {
                self.status = QueryStatus::Error;
                self.error = Some(err);
            }
        }
        self.fetched_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Invalidates any in-flight request for this key.
    ///
    /// A loading entry falls back to the state of its last settled response so
    /// the next fetch is not blocked by single-flight.
    pub fn supersede(&mut self) {
        self.request_id += 1;
        if self.is_loading() {
            self.status = if self.error.is_some() {
                QueryStatus::Error
            } else if self.data.is_some() {
                QueryStatus::Success
            } else {
                QueryStatus::Idle
            };
        }
        self.updated_at = Utc::now();
    }
}

/// Observable cache shared by the coordinators and the stores.
///
/// All mutation goes through [`QueryCache::mutate`], which patches a single
/// key while holding the lock and notifies subscribers afterwards. The lock is
/// never held across an await point.
pub struct QueryCache<T> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<T>>>>,
    version: Arc<watch::Sender<u64>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            version: Arc::clone(&self.version),
        }
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryCache<T> {
    #[must_use]
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            version: Arc::new(version),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.lock().get(key).cloned()
    }

    /// Applies `patch` to the entry for `key`, creating an idle entry first if
    /// the key has never been seen.
    pub fn mutate<R>(&self, key: &str, patch: impl FnOnce(&mut CacheEntry<T>) -> R) -> R {
        let out = {
            let mut entries = self.entries.lock();
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| CacheEntry::new(key));
            patch(entry)
        };
        self.notify();
        out
    }

    /// Like [`QueryCache::mutate`], but only notifies subscribers when the
    /// patch reports a change. Missing keys are left absent.
    pub fn mutate_if(&self, key: &str, patch: impl FnOnce(&mut CacheEntry<T>) -> bool) -> bool {
        let changed = {
            let mut entries = self.entries.lock();
            entries.get_mut(key).is_some_and(patch)
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Receiver that observes a new version after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}
