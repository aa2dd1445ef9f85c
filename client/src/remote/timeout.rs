//! Time bounds for one-shot remote calls.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reelmark_engine::{Document, DocumentKey, Fields, Filter, Revision};

use super::{RemoteCollectionClient, RemoteError, RemoteResult, Subscription};

/// Wraps a client so that no call waits longer than `timeout`.
///
/// Expiry maps to [`RemoteError::Unavailable`]. A timed-out write may still
/// land at the remote; the subscription reports it if it does.
#[derive(Debug, Clone)]
pub struct TimeoutRemote<R> {
    inner: R,
    timeout: Duration,
}

impl<R> TimeoutRemote<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

async fn bounded<T>(
    timeout: Duration,
    op: &'static str,
    fut: impl Future<Output = RemoteResult<T>>,
) -> RemoteResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            let ms = timeout.as_millis();
            tracing::warn!(op, timeout_ms = %ms, "Remote call timed out");
            Err(RemoteError::Unavailable(format!("{op} timed out after {ms}ms")))
        }
    }
}

#[async_trait]
impl<R: RemoteCollectionClient> RemoteCollectionClient for TimeoutRemote<R> {
    async fn subscribe(&self, collection: &str, filter: Filter) -> RemoteResult<Subscription> {
        bounded(
            self.timeout,
            "subscribe",
            self.inner.subscribe(collection, filter),
        )
        .await
    }

    async fn get_many(&self, collection: &str, filter: &Filter) -> RemoteResult<Vec<Document>> {
        bounded(
            self.timeout,
            "get_many",
            self.inner.get_many(collection, filter),
        )
        .await
    }

    async fn put(
        &self,
        collection: &str,
        key: DocumentKey,
        fields: Fields,
    ) -> RemoteResult<Document> {
        bounded(self.timeout, "put", self.inner.put(collection, key, fields)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<Option<Revision>> {
        bounded(self.timeout, "delete", self.inner.delete(collection, id)).await
    }
}
