//! Shared holder for one collection's projection.
//!
//! The pump task and the store's own writes both update the projection
//! through a cell. Every update replaces the projection whole under one lock
//! and is then published on a `watch` channel, so readers only ever see
//! complete snapshots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reelmark_engine::{Entity, Projection, Rejected, Snapshot};
use tokio::sync::watch;

/// Outcome of offering a snapshot to a cell.
#[derive(Debug)]
pub enum Applied {
    /// The snapshot replaced the projection; undecodable documents listed.
    Replaced { rejected: Vec<Rejected> },
    /// The projection already reflects a newer revision.
    Stale,
    /// The cell was closed.
    Closed,
}

#[derive(Debug)]
struct CellState<T> {
    open: bool,
    current: Arc<Projection<T>>,
}

/// Holder of the live projection for one collection of one session.
#[derive(Debug)]
pub struct ProjectionCell<T> {
    state: Mutex<CellState<T>>,
    tx: watch::Sender<Arc<Projection<T>>>,
}

impl<T: Entity> Default for ProjectionCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ProjectionCell<T> {
    /// An open cell holding an empty projection.
    pub fn new() -> Self {
        let current = Arc::new(Projection::empty());
        let (tx, _) = watch::channel(Arc::clone(&current));
        Self {
            state: Mutex::new(CellState {
                open: true,
                current,
            }),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CellState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The latest projection.
    pub fn current(&self) -> Arc<Projection<T>> {
        Arc::clone(&self.lock().current)
    }

    /// A receiver notified on every replacement.
    pub fn watch(&self) -> watch::Receiver<Arc<Projection<T>>> {
        self.tx.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Replace the projection with one built from `snapshot`.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> Applied {
        let (projection, rejected) = Projection::from_snapshot(snapshot);

        let mut state = self.lock();
        if !state.open {
            return Applied::Closed;
        }
        if state.current.is_newer_than(projection.revision()) {
            return Applied::Stale;
        }
        self.publish(&mut state, projection);
        Applied::Replaced { rejected }
    }

    /// Apply a write the remote has confirmed.
    ///
    /// `update` returns `None` when the projection already reflects the
    /// write. Returns true if the projection changed.
    pub fn apply_local(&self, update: impl FnOnce(&Projection<T>) -> Option<Projection<T>>) -> bool {
        let mut state = self.lock();
        if !state.open {
            return false;
        }
        match update(&state.current) {
            Some(projection) => {
                self.publish(&mut state, projection);
                true
            }
            None => false,
        }
    }

    /// Stop accepting updates. Idempotent.
    pub fn close(&self) {
        self.lock().open = false;
    }

    fn publish(&self, state: &mut CellState<T>, projection: Projection<T>) {
        let projection = Arc::new(projection);
        state.current = Arc::clone(&projection);
        self.tx.send_replace(projection);
    }
}
