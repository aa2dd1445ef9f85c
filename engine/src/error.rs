//! Error types for the Reelmark engine.

use crate::{CollectionName, DocumentId};
use thiserror::Error;

/// All possible errors from the Reelmark engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("rating must be between 1 and 10, got {0}")]
    RatingOutOfRange(i64),

    #[error("rating is not a whole number: {0:?}")]
    RatingNotNumeric(String),

    // Decode errors
    #[error("document {id} belongs to '{actual}', expected '{expected}'")]
    WrongCollection {
        id: DocumentId,
        expected: CollectionName,
        actual: CollectionName,
    },

    #[error("invalid document {id}: {reason}")]
    InvalidDocument { id: DocumentId, reason: String },
}

impl Error {
    /// True for errors caused by user input rather than by remote data.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::RatingOutOfRange(_) | Error::RatingNotNumeric(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
