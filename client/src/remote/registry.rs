//! Listener registry for in-process subscriptions.
//!
//! Tracks active subscriptions and delivers snapshots to them.

use std::sync::Arc;

use dashmap::DashMap;
use reelmark_engine::{CollectionName, Filter, Snapshot};
use tokio::sync::mpsc;

use super::SubscriptionId;

/// Sender for snapshots.
pub type SnapshotSender = mpsc::UnboundedSender<Snapshot>;

/// A single registered subscription.
#[derive(Debug)]
pub struct Listener {
    /// Unique identifier for this listener
    pub id: SubscriptionId,
    /// Collection the query runs against
    pub collection: CollectionName,
    /// Query predicate
    pub filter: Filter,
    /// Channel to the subscription
    pub sender: SnapshotSender,
}

/// Manages active listeners.
///
/// Thread-safe and can be shared across tasks via `Arc`.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    /// All active listeners, keyed by subscription ID.
    listeners: DashMap<SubscriptionId, Listener>,
    /// Index of listeners by collection for efficient fan-out.
    by_collection: DashMap<CollectionName, Vec<SubscriptionId>>,
}

impl ListenerRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            by_collection: DashMap::new(),
        }
    }

    /// Create a new registry wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new listener.
    ///
    /// Returns the subscription ID.
    pub fn register(&self, collection: &str, filter: Filter, sender: SnapshotSender) -> SubscriptionId {
        let id = uuid::Uuid::new_v4().to_string();

        let listener = Listener {
            id: id.clone(),
            collection: collection.to_string(),
            filter,
            sender,
        };

        self.listeners.insert(id.clone(), listener);

        self.by_collection
            .entry(collection.to_string())
            .or_default()
            .push(id.clone());

        tracing::info!(subscription = %id, collection, "Listener registered");

        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn unregister(&self, id: &str) -> bool {
        let Some((_, listener)) = self.listeners.remove(id) else {
            return false;
        };

        if let Some(mut ids) = self.by_collection.get_mut(&listener.collection) {
            ids.retain(|other| other != id);
            // Clean up empty entries
            if ids.is_empty() {
                drop(ids);
                self.by_collection
                    .remove_if(&listener.collection, |_, ids| ids.is_empty());
            }
        }

        tracing::info!(subscription = %id, collection = %listener.collection, "Listener unregistered");
        true
    }

    /// Listeners on a collection with their filters.
    pub fn listeners_for(&self, collection: &str) -> Vec<(SubscriptionId, Filter)> {
        let ids = match self.by_collection.get(collection) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };

        ids.into_iter()
            .filter_map(|id| {
                self.listeners
                    .get(&id)
                    .map(|listener| (id, listener.filter.clone()))
            })
            .collect()
    }

    /// Send a snapshot to one listener.
    ///
    /// Returns false if the listener is gone or its receiver was dropped.
    pub fn send_to(&self, id: &str, snapshot: Snapshot) -> bool {
        match self.listeners.get(id) {
            Some(listener) => listener.sender.send(snapshot).is_ok(),
            None => false,
        }
    }

    /// Number of active listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of collections with at least one listener.
    pub fn collection_count(&self) -> usize {
        self.by_collection.len()
    }
}
