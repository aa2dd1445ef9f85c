//! Unified error handling for the sync layer.

use crate::remote::RemoteError;
use reelmark_engine::DocumentId;

/// Errors surfaced by stores, the coordinator and the catalog client.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Bad user input or an undecodable document; never reaches the remote.
    #[error("{0}")]
    Invalid(#[from] reelmark_engine::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("review not found: {0}")]
    ReviewNotFound(DocumentId),

    #[error("no active session")]
    NoSession,

    #[error("session has ended")]
    SessionEnded,

    #[error("catalog search failed: {0}")]
    Catalog(String),
}

impl SyncError {
    /// True when the caller supplied invalid input (e.g. a rating of 15).
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Invalid(e) if e.is_validation())
    }

    /// True when the remote could not be reached or timed out.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SyncError::Remote(RemoteError::Unavailable(_)))
    }

    /// True when the remote refused the operation.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SyncError::Remote(RemoteError::PermissionDenied(_)))
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
