//! Turns raw keystrokes into committed search queries.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::normalize_query;

struct PendingCommit {
    normalized: String,
    cancel: CancellationToken,
}

/// Debounces input changes.
///
/// Every change restarts a timer; when it expires the normalized input is
/// committed unless it equals the last commit. Input that normalizes to the
/// empty string is committed immediately. Commits are delivered on the
/// receiver returned by [`Debouncer::new`].
///
/// Must be used from within a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<PendingCommit>>,
    last_committed: Arc<Mutex<String>>,
    commits: mpsc::UnboundedSender<String>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (commits, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            delay,
            pending: Mutex::new(None),
            last_committed: Arc::new(Mutex::new(String::new())),
            commits,
        };
        (debouncer, rx)
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn last_committed(&self) -> String {
        self.last_committed.lock().clone()
    }

    /// Records one input change, restarting the timer.
    pub fn on_input_change(&self, raw: &str) {
        self.cancel_pending();

        let normalized = normalize_query(raw);
        if normalized.is_empty() {
            commit(&self.last_committed, &self.commits, normalized);
            return;
        }

        let cancel = CancellationToken::new();
        *self.pending.lock() = Some(PendingCommit {
            normalized: normalized.clone(),
            cancel: cancel.clone(),
        });

        let last_committed = Arc::clone(&self.last_committed);
        let commits = self.commits.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = sleep(delay) => {}
            }
            commit(&last_committed, &commits, normalized);
        });
    }

    /// Commits the pending input now instead of waiting for the timer.
    pub fn flush(&self) {
        let Some(pending) = self.pending.lock().take() else {
            return;
        };
        pending.cancel.cancel();
        commit(&self.last_committed, &self.commits, pending.normalized);
    }

    /// Drops the pending input without committing it.
    pub fn cancel_pending(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn commit(
    last_committed: &Mutex<String>,
    commits: &mpsc::UnboundedSender<String>,
    normalized: String,
) -> bool {
    let mut last = last_committed.lock();
    if *last == normalized {
        debug!(query = %normalized, "Query unchanged, not committing");
        return false;
    }
    last.clone_from(&normalized);
    drop(last);

    info!(query = %normalized, "Committed search query");
    commits.send(normalized).is_ok()
}
