//! # Reelmark Client
//!
//! The sync layer between the Reelmark app and its remote document store.
//!
//! A [`SyncCoordinator`] follows the signed-in session. While a session is
//! active it keeps one live subscription per collection and exposes the
//! user's data through two stores:
//!
//! - [`ReviewStore`] - create, revise and delete reviews. Deleting a review
//!   also deletes every favorite of the same movie.
//! - [`FavoriteStore`] - toggle favorites and clean them up per movie
//!
//! Both stores read from projections that are replaced whole on every
//! snapshot and can be observed through `tokio::sync::watch` receivers.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reelmark_client::{MemoryRemote, Session, SyncContext, SyncCoordinator};
//! use reelmark_engine::MovieRef;
//!
//! # async fn demo() -> reelmark_client::Result<()> {
//! let ctx = SyncContext::new(Arc::new(MemoryRemote::new()));
//! let mut coordinator = SyncCoordinator::new(ctx);
//! coordinator.start(Session::new("user-1")).await?;
//!
//! let movie = MovieRef::new("tt0111161", "The Shawshank Redemption");
//! let review = coordinator.reviews()?.submit(&movie, "9", "Great film", None).await?;
//! coordinator.favorites()?.toggle(&movie).await?;
//!
//! coordinator.reviews()?.remove(&review.id).await?;
//! assert!(!coordinator.favorites()?.contains("tt0111161"));
//! coordinator.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cell;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod favorites;
pub mod remote;
pub mod reviews;
pub mod session;

pub use catalog::{CatalogSearch, OmdbCatalog};
pub use config::{Config, ConfigError};
pub use coordinator::SyncCoordinator;
pub use error::{Result, SyncError};
pub use favorites::{FavoriteStore, Toggle};
pub use remote::{
    MemoryRemote, RemoteCollectionClient, RemoteError, Subscription, TimeoutRemote,
};
pub use reviews::ReviewStore;
pub use session::{Session, SyncContext};
