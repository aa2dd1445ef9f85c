//! In-process document store.
//!
//! Behaves like the hosted store the app talks to: server-assigned ids and
//! timestamps, a store-wide revision counter, and live queries that receive
//! the full matching result set after every relevant write. Faults can be
//! injected to exercise the error paths of the sync layer.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use reelmark_engine::{
    CollectionName, Document, DocumentId, DocumentKey, Fields, Filter, Revision, Snapshot,
    Timestamp, UserId,
};
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    CancelHandle, ListenerRegistry, RemoteCollectionClient, RemoteError, RemoteResult,
    Subscription,
};

const OWNER_FIELD: &str = "userId";

#[derive(Debug, Default)]
struct State {
    collections: HashMap<CollectionName, BTreeMap<DocumentId, Document>>,
    revision: Revision,
    clock: Timestamp,
    writes: HashMap<CollectionName, u64>,
}

impl State {
    fn query(&self, collection: &str, filter: &Filter) -> Snapshot {
        let documents = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(&doc.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Snapshot::new(collection, documents, self.revision)
    }

    fn get(&self, collection: &str, id: &str) -> Option<&Document> {
        self.collections.get(collection).and_then(|docs| docs.get(id))
    }

    /// Next server timestamp, strictly increasing.
    fn tick(&mut self) -> Timestamp {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        self.clock = now.max(self.clock + 1);
        self.clock
    }

    fn record_write(&mut self, collection: &str) -> Revision {
        self.revision += 1;
        *self.writes.entry(collection.to_string()).or_default() += 1;
        self.revision
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    listeners: Arc<ListenerRegistry>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    denied_users: DashSet<UserId>,
}

/// An in-memory [`RemoteCollectionClient`].
///
/// Cheap to clone; clones share the same data, so one instance can stand
/// in for the backend seen by several devices.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Inner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_available(&self, available: bool) {
        self.inner.offline.store(!available, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Refuse every call touching data owned by `user_id`.
    pub fn deny_user(&self, user_id: impl Into<UserId>) {
        self.inner.denied_users.insert(user_id.into());
    }

    /// Lift a previous [`MemoryRemote::deny_user`].
    pub fn allow_user(&self, user_id: &str) {
        self.inner.denied_users.remove(user_id);
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.listener_count()
    }

    /// Number of writes (puts and effective deletes) applied to a collection.
    pub fn write_count(&self, collection: &str) -> u64 {
        self.lock().writes.get(collection).copied().unwrap_or_default()
    }

    /// All documents currently stored in a collection, ordered by id.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock().query(collection, &Filter::new()).documents
    }

    /// Current store-wide revision.
    pub fn revision(&self) -> Revision {
        self.lock().revision
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn gate(&self, owner: Option<&str>) -> RemoteResult<()> {
        let latency = self.inner.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("store is offline".into()));
        }
        if let Some(owner) = owner {
            self.check_owner(owner)?;
        }
        Ok(())
    }

    fn check_owner(&self, owner: &str) -> RemoteResult<()> {
        if self.inner.denied_users.contains(owner) {
            return Err(RemoteError::PermissionDenied(format!(
                "access to data of user {owner} is not allowed"
            )));
        }
        Ok(())
    }

    /// Push a fresh result set to every listener whose query saw the change.
    fn notify(&self, state: &State, collection: &str, before: Option<&Fields>, after: Option<&Fields>) {
        let registry = &self.inner.listeners;
        for (id, filter) in registry.listeners_for(collection) {
            let affected = before.is_some_and(|f| filter.matches(f))
                || after.is_some_and(|f| filter.matches(f));
            if !affected {
                continue;
            }
            if !registry.send_to(&id, state.query(collection, &filter)) {
                registry.unregister(&id);
            }
        }
    }
}

fn owner_of(fields: &Fields) -> Option<&str> {
    fields.get(OWNER_FIELD).and_then(Value::as_str)
}

#[async_trait]
impl RemoteCollectionClient for MemoryRemote {
    async fn subscribe(&self, collection: &str, filter: Filter) -> RemoteResult<Subscription> {
        let owner = filter.value_of(OWNER_FIELD).and_then(Value::as_str);
        self.gate(owner).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        // Registered under the state lock so no write can slip between the
        // initial snapshot and the first change notification.
        let state = self.lock();
        let initial = state.query(collection, &filter);
        let _ = tx.send(initial);
        let id = self.inner.listeners.register(collection, filter, tx);
        drop(state);

        let registry = Arc::clone(&self.inner.listeners);
        let cancel_id = id.clone();
        let handle = CancelHandle::new(move || {
            registry.unregister(&cancel_id);
        });

        Ok(Subscription::new(id, collection, rx, handle))
    }

    async fn get_many(&self, collection: &str, filter: &Filter) -> RemoteResult<Vec<Document>> {
        let owner = filter.value_of(OWNER_FIELD).and_then(Value::as_str);
        self.gate(owner).await?;
        Ok(self.lock().query(collection, filter).documents)
    }

    async fn put(
        &self,
        collection: &str,
        key: DocumentKey,
        fields: Fields,
    ) -> RemoteResult<Document> {
        self.gate(owner_of(&fields)).await?;

        let mut state = self.lock();
        let id = match key {
            DocumentKey::New => uuid::Uuid::new_v4().to_string(),
            DocumentKey::Existing(id) => id,
        };

        let previous = state.get(collection, &id).cloned();
        if let Some(owner) = previous.as_ref().and_then(|doc| owner_of(&doc.fields)) {
            self.check_owner(owner)?;
        }

        let now = state.tick();
        let revision = state.record_write(collection);
        let doc = Document {
            id: id.clone(),
            collection: collection.to_string(),
            fields,
            create_time: previous.as_ref().map_or(now, |doc| doc.create_time),
            update_time: now,
            revision,
        };

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, doc.clone());

        self.notify(
            &state,
            collection,
            previous.as_ref().map(|doc| &doc.fields),
            Some(&doc.fields),
        );

        tracing::trace!(collection, id = %doc.id, revision, "Document written");
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<Option<Revision>> {
        self.gate(None).await?;

        let mut state = self.lock();
        let Some(existing) = state.get(collection, id).cloned() else {
            return Ok(None);
        };
        if let Some(owner) = owner_of(&existing.fields) {
            self.check_owner(owner)?;
        }

        if let Some(docs) = state.collections.get_mut(collection) {
            docs.remove(id);
        }
        let revision = state.record_write(collection);

        self.notify(&state, collection, Some(&existing.fields), None);

        tracing::trace!(collection, id, revision, "Document deleted");
        Ok(Some(revision))
    }
}
