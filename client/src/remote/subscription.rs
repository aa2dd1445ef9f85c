//! Cancellable snapshot streams.

use futures::Stream;
use reelmark_engine::Snapshot;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Identifier of a subscription at the remote.
pub type SubscriptionId = String;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Shared handle that cancels a subscription from outside its consumer.
///
/// The cancel hook runs at most once. Once [`CancelHandle::cancel`]
/// returns, the remote holds no listener for the subscription and the
/// subscription yields nothing more.
#[derive(Clone)]
pub struct CancelHandle {
    hook: Arc<Mutex<Option<CancelFn>>>,
}

impl CancelHandle {
    /// Wrap the remote's unregister hook.
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            hook: Arc::new(Mutex::new(Some(Box::new(hook)))),
        }
    }

    /// Cancel the subscription. Returns false if it was already cancelled.
    pub fn cancel(&self) -> bool {
        let hook = self
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match hook {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A live query against one collection.
///
/// Yields the initial snapshot followed by one snapshot per change, until
/// cancelled. Dropping a subscription cancels it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    collection: String,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    handle: CancelHandle,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        collection: impl Into<String>,
        rx: mpsc::UnboundedReceiver<Snapshot>,
        handle: CancelHandle,
    ) -> Self {
        Self {
            id,
            collection: collection.into(),
            rx,
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// A handle that can cancel this subscription while another task owns it.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Wait for the next snapshot. Returns `None` once cancelled or closed.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.handle.is_cancelled() {
            return None;
        }
        let snapshot = self.rx.recv().await?;
        // Cancelled while the snapshot sat in the buffer.
        if self.handle.is_cancelled() {
            self.rx.close();
            return None;
        }
        Some(snapshot)
    }

    /// Cancel and discard anything already buffered.
    pub fn cancel(&mut self) {
        self.handle.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Snapshot>> {
        let this = self.get_mut();
        if this.handle.is_cancelled() {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(_)) if this.handle.is_cancelled() => Poll::Ready(None),
            other => other,
        }
    }
}
