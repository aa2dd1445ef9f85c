//! FavoriteStore - the signed-in user's favorite movies.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use reelmark_engine::{
    DocumentId, DocumentKey, Entity, Favorite, FavoriteFields, Filter, MovieRef, Projection,
};
use tokio::sync::watch;

use crate::error::Result;
use crate::remote::RemoteError;
use crate::session::SessionScope;

/// Result of [`FavoriteStore::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    /// True if the movie is now a favorite, false if it was removed.
    pub added: bool,
}

/// Handle to the favorites of one session. Cheap to clone.
#[derive(Clone)]
pub struct FavoriteStore {
    scope: Arc<SessionScope>,
}

impl FavoriteStore {
    pub(crate) fn new(scope: Arc<SessionScope>) -> Self {
        Self { scope }
    }

    pub fn user_id(&self) -> &str {
        &self.scope.user_id
    }

    /// Add the movie to favorites, or remove it if it already is one.
    ///
    /// The decision is taken from the local projection. A concurrent toggle
    /// on another device can interleave with it; the last write wins.
    pub async fn toggle(&self, movie: &MovieRef) -> Result<Toggle> {
        self.scope.ensure_open()?;

        let existing: Vec<DocumentId> = self
            .scope
            .favorites
            .current()
            .by_movie(&movie.movie_id)
            .map(|f| f.id.clone())
            .collect();

        if existing.is_empty() {
            let fields = FavoriteFields::new(self.user_id(), movie).into_fields();
            let doc = self
                .scope
                .remote
                .put(Favorite::COLLECTION, DocumentKey::New, fields)
                .await
                .inspect_err(|e| {
                    tracing::error!(movie_id = %movie.movie_id, error = %e, "Failed to add favorite")
                })?;
            let favorite = Favorite::from_document(&doc)?;
            self.scope
                .favorites
                .apply_local(|p| p.with_upsert(favorite, doc.revision));

            tracing::info!(user_id = %self.user_id(), movie_id = %movie.movie_id, "Favorite added");
            Ok(Toggle { added: true })
        } else {
            self.delete_all(&existing).await?;
            tracing::info!(
                user_id = %self.user_id(),
                movie_id = %movie.movie_id,
                removed = existing.len(),
                "Favorite removed"
            );
            Ok(Toggle { added: false })
        }
    }

    /// Delete every favorite of this user for `movie_id`.
    ///
    /// Looks at both the projection and the remote, so favorites the
    /// subscription has not delivered yet are removed too. If the remote
    /// read fails, the favorites already known locally are still deleted
    /// before the read error is returned.
    pub async fn cascade_delete_for(&self, movie_id: &str) -> Result<()> {
        self.scope.ensure_open()?;

        let mut ids: BTreeSet<DocumentId> = self
            .scope
            .favorites
            .current()
            .by_movie(movie_id)
            .map(|f| f.id.clone())
            .collect();

        let filter = Filter::new()
            .eq("userId", self.user_id())
            .eq("movieId", movie_id);
        let lookup = self
            .scope
            .remote
            .get_many(Favorite::COLLECTION, &filter)
            .await;
        let read_error = match lookup {
            Ok(docs) => {
                ids.extend(docs.into_iter().map(|doc| doc.id));
                None
            }
            Err(err) => {
                tracing::warn!(
                    movie_id,
                    error = %err,
                    known = ids.len(),
                    "Favorite lookup failed, deleting known favorites only"
                );
                Some(err)
            }
        };

        if !ids.is_empty() {
            let ids: Vec<_> = ids.into_iter().collect();
            self.delete_all(&ids).await?;
            tracing::info!(movie_id, removed = ids.len(), "Cascaded favorite delete");
        } else {
            tracing::debug!(movie_id, "No favorites to cascade");
        }

        match read_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Whether `movie_id` is currently a favorite.
    pub fn contains(&self, movie_id: &str) -> bool {
        self.scope.favorites.current().contains_movie(movie_id)
    }

    /// Favorites, most recently added first.
    pub fn list(&self) -> Vec<Favorite> {
        self.scope.favorites.current().to_vec()
    }

    /// Reactive view of the projection.
    pub fn watch(&self) -> watch::Receiver<Arc<Projection<Favorite>>> {
        self.scope.favorites.watch()
    }

    /// Delete documents concurrently; every id is attempted even if some fail.
    async fn delete_all(&self, ids: &[DocumentId]) -> Result<()> {
        let remote = &self.scope.remote;
        let results = join_all(ids.iter().map(|id| async move {
            remote
                .delete(Favorite::COLLECTION, id)
                .await
                .map(|revision| (id, revision))
        }))
        .await;

        let mut first_error: Option<RemoteError> = None;
        let mut deleted = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok((id, Some(revision))) => deleted.push((id, revision)),
                // Already gone; nothing was written.
                Ok((_, None)) => {}
                Err(err) => {
                    tracing::error!(error = %err, "Failed to delete favorite");
                    first_error.get_or_insert(err);
                }
            }
        }

        // Projections only move forward, so apply in revision order.
        deleted.sort_by_key(|(_, revision)| *revision);
        for (id, revision) in deleted {
            self.scope
                .favorites
                .apply_local(|p| p.with_removed(id, revision));
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
