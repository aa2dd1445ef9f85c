//! Projections - ordered, read-only views of one collection.
//!
//! A projection is never edited in place. Snapshots and confirmed local
//! writes each produce a new projection which the owner swaps in whole.

use crate::{error::Result, Document, DocumentId, Error, Revision, Snapshot, Timestamp};
use std::cmp::Ordering;

/// A record type stored in one remote collection.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name of the remote collection holding this type.
    const COLLECTION: &'static str;

    /// Decode and validate a remote document.
    fn from_document(doc: &Document) -> Result<Self>;

    /// Document id.
    fn id(&self) -> &str;

    /// Catalog id of the movie this record refers to.
    fn movie_id(&self) -> &str;

    /// Ordering key; projections list higher keys first.
    fn sort_key(&self) -> Timestamp;
}

/// A document that could not be decoded and was left out of a projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub id: DocumentId,
    pub error: Error,
}

/// The projection of one collection, sorted by [`Entity::sort_key`]
/// descending with ties broken by id.
#[derive(Debug, Clone)]
pub struct Projection<T> {
    entries: Vec<T>,
    revision: Revision,
}

impl<T: Entity> Default for Projection<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Entity> Projection<T> {
    /// An empty projection at revision 0.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            revision: 0,
        }
    }

    /// Build a projection from a snapshot.
    ///
    /// Documents that fail to decode are skipped and returned alongside.
    pub fn from_snapshot(snapshot: &Snapshot) -> (Self, Vec<Rejected>) {
        let mut entries = Vec::with_capacity(snapshot.documents.len());
        let mut rejected = Vec::new();

        for doc in &snapshot.documents {
            match T::from_document(doc) {
                Ok(entity) => entries.push(entity),
                Err(error) => rejected.push(Rejected {
                    id: doc.id.clone(),
                    error,
                }),
            }
        }

        entries.sort_by(compare::<T>);

        (
            Self {
                entries,
                revision: snapshot.revision,
            },
            rejected,
        )
    }

    /// Remote revision this projection reflects.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// True if `revision` is older than what this projection already holds.
    pub fn is_newer_than(&self, revision: Revision) -> bool {
        self.revision > revision
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Entries in display order, cloned.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by document id.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// All entries referring to a movie.
    pub fn by_movie<'a>(&'a self, movie_id: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        self.entries.iter().filter(move |e| e.movie_id() == movie_id)
    }

    /// Whether any entry refers to a movie.
    pub fn contains_movie(&self, movie_id: &str) -> bool {
        self.entries.iter().any(|e| e.movie_id() == movie_id)
    }

    /// A copy with `entity` inserted or replaced, as confirmed at `revision`.
    ///
    /// Returns `None` when this projection already reflects `revision`,
    /// in which case the write is already visible (or superseded).
    pub fn with_upsert(&self, entity: T, revision: Revision) -> Option<Self> {
        if revision <= self.revision {
            return None;
        }
        let mut entries: Vec<T> = self
            .entries
            .iter()
            .filter(|e| e.id() != entity.id())
            .cloned()
            .collect();
        let at = entries
            .binary_search_by(|other| compare(other, &entity))
            .unwrap_or_else(|at| at);
        entries.insert(at, entity);
        Some(Self { entries, revision })
    }

    /// A copy without the entry `id`, as confirmed at `revision`.
    ///
    /// Returns `None` when this projection already reflects `revision`.
    pub fn with_removed(&self, id: &str, revision: Revision) -> Option<Self> {
        if revision <= self.revision {
            return None;
        }
        let entries = self
            .entries
            .iter()
            .filter(|e| e.id() != id)
            .cloned()
            .collect();
        Some(Self { entries, revision })
    }
}

fn compare<T: Entity>(a: &T, b: &T) -> Ordering {
    b.sort_key()
        .cmp(&a.sort_key())
        .then_with(|| a.id().cmp(b.id()))
}
