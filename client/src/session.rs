//! Sessions and the context object handed to the coordinator.

use std::sync::Arc;
use std::time::Duration;

use reelmark_engine::{Favorite, Review, UserId};

use crate::cell::ProjectionCell;
use crate::error::{Result, SyncError};
use crate::remote::RemoteCollectionClient;

/// Default bound on waiting for a subscription's first snapshot.
pub const DEFAULT_INITIAL_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// A signed-in user, as reported by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Everything a coordinator needs from the outside world.
///
/// Passed in explicitly so several coordinators (one per test, or one per
/// account) can run side by side.
#[derive(Clone)]
pub struct SyncContext {
    remote: Arc<dyn RemoteCollectionClient>,
    initial_snapshot_timeout: Duration,
}

impl SyncContext {
    pub fn new(remote: Arc<dyn RemoteCollectionClient>) -> Self {
        Self {
            remote,
            initial_snapshot_timeout: DEFAULT_INITIAL_SNAPSHOT_TIMEOUT,
        }
    }

    pub fn with_initial_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.initial_snapshot_timeout = timeout;
        self
    }

    pub fn remote(&self) -> &Arc<dyn RemoteCollectionClient> {
        &self.remote
    }

    pub fn initial_snapshot_timeout(&self) -> Duration {
        self.initial_snapshot_timeout
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("initial_snapshot_timeout", &self.initial_snapshot_timeout)
            .finish_non_exhaustive()
    }
}

/// State shared by the stores of one active session.
pub(crate) struct SessionScope {
    pub(crate) user_id: UserId,
    pub(crate) remote: Arc<dyn RemoteCollectionClient>,
    pub(crate) reviews: Arc<ProjectionCell<Review>>,
    pub(crate) favorites: Arc<ProjectionCell<Favorite>>,
}

impl SessionScope {
    /// Fail once the session has been stopped.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.reviews.is_open() && self.favorites.is_open() {
            Ok(())
        } else {
            Err(SyncError::SessionEnded)
        }
    }

    pub(crate) fn close(&self) {
        self.reviews.close();
        self.favorites.close();
    }
}
