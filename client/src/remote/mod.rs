//! Access to the remote document store.
//!
//! The stores never talk to a concrete backend. They go through
//! [`RemoteCollectionClient`], which offers one-shot reads and writes plus
//! cancellable subscriptions delivering full snapshots of a query.

mod memory;
mod registry;
mod subscription;
mod timeout;

pub use memory::MemoryRemote;
pub use registry::ListenerRegistry;
pub use subscription::{CancelHandle, Subscription, SubscriptionId};
pub use timeout::TimeoutRemote;

use async_trait::async_trait;
use reelmark_engine::{Document, DocumentKey, Fields, Filter, Revision};
use std::sync::Arc;

/// Failures reported by a remote store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A remote document store organised in named collections.
///
/// Independent writes issued concurrently to different documents may be
/// applied in any order.
#[async_trait]
pub trait RemoteCollectionClient: Send + Sync {
    /// Subscribe to the documents of `collection` matching `filter`.
    ///
    /// The subscription yields the current result set first and then a new
    /// full result set every time a matching document changes.
    async fn subscribe(&self, collection: &str, filter: Filter) -> RemoteResult<Subscription>;

    /// One-shot read of the documents matching `filter`.
    async fn get_many(&self, collection: &str, filter: &Filter) -> RemoteResult<Vec<Document>>;

    /// Create a document or overwrite an existing one.
    async fn put(&self, collection: &str, key: DocumentKey, fields: Fields)
        -> RemoteResult<Document>;

    /// Delete a document. Deleting an absent id succeeds without effect.
    ///
    /// Returns the revision of the delete, or `None` when there was nothing
    /// to delete and no write happened.
    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<Option<Revision>>;
}

#[async_trait]
impl<R: RemoteCollectionClient + ?Sized> RemoteCollectionClient for Arc<R> {
    async fn subscribe(&self, collection: &str, filter: Filter) -> RemoteResult<Subscription> {
        (**self).subscribe(collection, filter).await
    }

    async fn get_many(&self, collection: &str, filter: &Filter) -> RemoteResult<Vec<Document>> {
        (**self).get_many(collection, filter).await
    }

    async fn put(
        &self,
        collection: &str,
        key: DocumentKey,
        fields: Fields,
    ) -> RemoteResult<Document> {
        (**self).put(collection, key, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<Option<Revision>> {
        (**self).delete(collection, id).await
    }
}
