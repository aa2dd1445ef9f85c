//! SyncCoordinator - subscription lifecycle for a signed-in session.
//!
//! On session start the coordinator opens one subscription per collection,
//! applies the initial snapshots, and hands each subscription to a pump
//! task that applies every later snapshot to the matching projection. On
//! session end (or drop) it closes the projections, cancels the
//! subscriptions and stops the pumps, in that order, so that nothing is
//! applied once `stop` has returned.

use std::sync::Arc;

use reelmark_engine::{Entity, Favorite, Filter, Review, Snapshot};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cell::{Applied, ProjectionCell};
use crate::error::Result;
use crate::favorites::FavoriteStore;
use crate::remote::{CancelHandle, RemoteError, Subscription};
use crate::reviews::ReviewStore;
use crate::session::{Session, SessionScope, SyncContext};
use crate::SyncError;

/// A running pump and the means to stop it.
struct Pump {
    cancel: CancelHandle,
    task: JoinHandle<()>,
}

struct ActiveSession {
    scope: Arc<SessionScope>,
    pumps: Vec<Pump>,
}

impl ActiveSession {
    /// Stop delivery synchronously; returns the pump tasks to await.
    fn shutdown(self) -> Vec<JoinHandle<()>> {
        self.scope.close();
        self.pumps
            .into_iter()
            .map(|pump| {
                pump.cancel.cancel();
                pump.task.abort();
                pump.task
            })
            .collect()
    }
}

/// Owns the subscriptions of at most one session at a time.
pub struct SyncCoordinator {
    ctx: SyncContext,
    active: Option<ActiveSession>,
}

impl SyncCoordinator {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx, active: None }
    }

    /// User of the active session, if any.
    pub fn active_user(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.scope.user_id.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Begin syncing for `session`.
    ///
    /// Returns once both projections hold their initial snapshot. Starting
    /// again for the same user is a no-op; starting for another user ends
    /// the current session first.
    pub async fn start(&mut self, session: Session) -> Result<()> {
        match self.active_user().map(|user| user == session.user_id) {
            Some(true) => {
                tracing::debug!(user_id = %session.user_id, "Session already active");
                return Ok(());
            }
            Some(false) => self.stop().await,
            None => {}
        }

        let remote = Arc::clone(self.ctx.remote());
        let filter = Filter::new().eq("userId", session.user_id.as_str());

        // Dropping a subscription cancels it, so early returns leak nothing.
        let mut reviews_sub = remote.subscribe(Review::COLLECTION, filter.clone()).await?;
        let mut favorites_sub = remote.subscribe(Favorite::COLLECTION, filter).await?;

        let reviews = Arc::new(ProjectionCell::<Review>::new());
        let favorites = Arc::new(ProjectionCell::<Favorite>::new());

        let initial = self.initial_snapshot(&mut reviews_sub).await?;
        apply(&reviews, &initial, &session.user_id);
        let initial = self.initial_snapshot(&mut favorites_sub).await?;
        apply(&favorites, &initial, &session.user_id);

        let pumps = vec![
            spawn_pump(reviews_sub, Arc::clone(&reviews), session.user_id.clone()),
            spawn_pump(favorites_sub, Arc::clone(&favorites), session.user_id.clone()),
        ];

        tracing::info!(
            user_id = %session.user_id,
            reviews = reviews.current().len(),
            favorites = favorites.current().len(),
            "Sync session started"
        );

        self.active = Some(ActiveSession {
            scope: Arc::new(SessionScope {
                user_id: session.user_id,
                remote,
                reviews,
                favorites,
            }),
            pumps,
        });
        Ok(())
    }

    /// End the active session, if any.
    ///
    /// Once this returns no snapshot is applied and the remote holds no
    /// listener for the session. Store handles of the session fail with
    /// [`SyncError::SessionEnded`] from then on.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let user_id = active.scope.user_id.clone();

        for task in active.shutdown() {
            // Aborted tasks report a cancellation error; nothing to handle.
            let _ = task.await;
        }

        tracing::info!(user_id = %user_id, "Sync session stopped");
    }

    /// Follow a session provider until it goes away.
    ///
    /// `Some(session)` starts (or switches to) that session, `None` ends the
    /// current one. A failed start is logged and retried on the next change.
    pub async fn run(&mut self, mut sessions: watch::Receiver<Option<Session>>) {
        loop {
            let current = sessions.borrow_and_update().clone();
            match current {
                Some(session) => {
                    let user_id = session.user_id.clone();
                    if let Err(err) = self.start(session).await {
                        tracing::error!(user_id = %user_id, error = %err, "Failed to start sync session");
                    }
                }
                None => self.stop().await,
            }

            if sessions.changed().await.is_err() {
                break;
            }
        }

        self.stop().await;
    }

    /// Reviews of the active session.
    pub fn reviews(&self) -> Result<ReviewStore> {
        self.scope().map(ReviewStore::new)
    }

    /// Favorites of the active session.
    pub fn favorites(&self) -> Result<FavoriteStore> {
        self.scope().map(FavoriteStore::new)
    }

    fn scope(&self) -> Result<Arc<SessionScope>> {
        self.active
            .as_ref()
            .map(|a| Arc::clone(&a.scope))
            .ok_or(SyncError::NoSession)
    }

    async fn initial_snapshot(&self, subscription: &mut Subscription) -> Result<Snapshot> {
        let timeout = self.ctx.initial_snapshot_timeout();
        let collection = subscription.collection().to_string();
        match tokio::time::timeout(timeout, subscription.next()).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(RemoteError::Unavailable(format!(
                "{collection} subscription closed before its first snapshot"
            ))
            .into()),
            Err(_) => Err(RemoteError::Unavailable(format!(
                "no {collection} snapshot within {}ms",
                timeout.as_millis()
            ))
            .into()),
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.shutdown();
        }
    }
}

fn apply<T: Entity>(cell: &ProjectionCell<T>, snapshot: &Snapshot, user_id: &str) -> bool {
    match cell.apply_snapshot(snapshot) {
        Applied::Replaced { rejected } => {
            for r in rejected {
                tracing::warn!(
                    user_id,
                    collection = T::COLLECTION,
                    id = %r.id,
                    error = %r.error,
                    "Skipping malformed document"
                );
            }
            tracing::debug!(
                user_id,
                collection = T::COLLECTION,
                revision = snapshot.revision,
                documents = snapshot.len(),
                "Snapshot applied"
            );
            true
        }
        Applied::Stale => {
            tracing::trace!(
                collection = T::COLLECTION,
                revision = snapshot.revision,
                "Stale snapshot ignored"
            );
            true
        }
        Applied::Closed => false,
    }
}

fn spawn_pump<T: Entity>(
    mut subscription: Subscription,
    cell: Arc<ProjectionCell<T>>,
    user_id: String,
) -> Pump {
    let cancel = subscription.cancel_handle();
    let task = tokio::spawn(async move {
        while let Some(snapshot) = subscription.next().await {
            if !apply(&cell, &snapshot, &user_id) {
                break;
            }
        }
        tracing::debug!(user_id = %user_id, collection = T::COLLECTION, "Pump finished");
    });
    Pump { cancel, task }
}
