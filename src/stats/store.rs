//! In-memory holder for the last known-good [`Snapshot`].
//!
//! The refresh scheduler is the only writer; the HTTP handlers read it on
//! every request. Reads are synchronous and return an owned copy, so a
//! handler never waits on a fetch and never sees fields from two different
//! fetches mixed together.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::models::Snapshot;

/// Cloneable handle to the shared snapshot.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<watch::Sender<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store in the "loading" state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        SnapshotStore {
            inner: Arc::new(tx),
        }
    }

    /// Swap in a new snapshot as a whole.
    ///
    /// Snapshots without a fetch time, or older than the stored one, are
    /// ignored: a present snapshot never goes back to loading and
    /// `fetched_at` never moves backwards. Returns whether the swap happened.
    pub fn replace(&self, snapshot: Snapshot) -> bool {
        self.inner.send_if_modified(|current| {
            let Some(new_at) = snapshot.fetched_at else {
                return false;
            };
            if current.fetched_at.is_some_and(|cur_at| new_at < cur_at) {
                debug!("SnapshotStore: ignoring snapshot older than current");
                return false;
            }
            *current = snapshot;
            true
        })
    }

    /// Copy of the current snapshot.
    pub fn read(&self) -> Snapshot {
        self.inner.borrow().clone()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
