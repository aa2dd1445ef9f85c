//! # Reelmark Engine
//!
//! The IO-free core of Reelmark: the shapes of the documents kept in the
//! remote store, typed records decoded from them, and the projections the
//! client shows to its presentation layer.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about networks, tasks or sessions
//! - **Validate at the boundary**: remote documents are decoded into typed
//!   records and anything malformed is rejected, never trusted
//! - **Whole-value updates**: a projection is rebuilt from a snapshot and
//!   swapped in as a unit, so a reader never observes a half-applied change
//!
//! ## Core Concepts
//!
//! ### Documents
//!
//! A [`Document`] is a schema-flexible record in a named collection. The
//! remote assigns its id, creation/update timestamps and a [`Revision`]: a
//! store-wide write counter used to order snapshots against local writes.
//!
//! ### Records
//!
//! - [`Review`] - a user's rating (see [`Rating`]) and text for one movie
//! - [`Favorite`] - a user's bookmark of one movie
//!
//! Both implement [`Entity`], which ties a record type to its collection and
//! to the decoding rules applied on read.
//!
//! ### Projections
//!
//! A [`Projection`] is the ordered, read-only view of one collection for one
//! user, built from a [`Snapshot`].
//!
//! ## Quick Start
//!
//! ```rust
//! use reelmark_engine::{Document, Entity, MovieRef, Projection, Rating, Review, ReviewFields, Snapshot};
//!
//! let movie = MovieRef::new("tt0111161", "The Shawshank Redemption").with_poster("N/A");
//! let fields = ReviewFields::new("user-1", &movie, Rating::new(9).unwrap(), "Great film");
//!
//! let doc = Document::new("rev-1", Review::COLLECTION, fields.into_fields())
//!     .with_times(1_706_745_600_000, 1_706_745_600_000)
//!     .with_revision(1);
//!
//! let snapshot = Snapshot::new(Review::COLLECTION, vec![doc], 1);
//! let (projection, rejected) = Projection::<Review>::from_snapshot(&snapshot);
//! assert!(rejected.is_empty());
//!
//! let review = projection.get("rev-1").unwrap();
//! assert_eq!(review.rating.get(), 9);
//! assert_eq!(review.poster_url, None);
//! ```

pub mod document;
pub mod error;
pub mod favorite;
pub mod movie;
pub mod projection;
pub mod rating;
pub mod review;
pub mod snapshot;

// Re-export main types at crate root
pub use document::{Document, DocumentKey, Fields, Filter};
pub use error::Error;
pub use favorite::{Favorite, FavoriteFields};
pub use movie::{normalize_poster, MovieRef};
pub use projection::{Entity, Projection, Rejected};
pub use rating::Rating;
pub use review::{Review, ReviewFields};
pub use snapshot::Snapshot;

/// Type aliases for clarity
pub type DocumentId = String;
pub type CollectionName = String;
pub type UserId = String;
pub type MovieId = String;
pub type Timestamp = u64;
pub type Revision = u64;
