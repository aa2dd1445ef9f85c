//! ReviewStore - the signed-in user's ratings and reviews.

use std::sync::Arc;

use reelmark_engine::{
    DocumentKey, Entity, MovieRef, Projection, Rating, Review, ReviewFields,
};
use tokio::sync::watch;

use crate::error::{Result, SyncError};
use crate::favorites::FavoriteStore;
use crate::session::SessionScope;

/// Handle to the reviews of one session. Cheap to clone.
#[derive(Clone)]
pub struct ReviewStore {
    scope: Arc<SessionScope>,
}

impl ReviewStore {
    pub(crate) fn new(scope: Arc<SessionScope>) -> Self {
        Self { scope }
    }

    pub fn user_id(&self) -> &str {
        &self.scope.user_id
    }

    /// Create a review, or revise `existing` if given.
    ///
    /// `rating` may be a number or the raw text of a form field. It is
    /// validated before anything is sent to the remote. When revising, only
    /// rating and text change; owner, movie, title and poster are kept.
    pub async fn submit<R>(
        &self,
        movie: &MovieRef,
        rating: R,
        text: impl Into<String>,
        existing: Option<&str>,
    ) -> Result<Review>
    where
        Rating: TryFrom<R, Error = reelmark_engine::Error>,
    {
        let rating = Rating::try_from(rating)?;
        self.scope.ensure_open()?;

        let (key, fields) = match existing {
            Some(id) => {
                let current = self.scope.reviews.current();
                let review = current
                    .get(id)
                    .ok_or_else(|| SyncError::ReviewNotFound(id.to_string()))?;
                (
                    DocumentKey::Existing(review.id.clone()),
                    review.fields().revise(rating, text),
                )
            }
            None => (
                DocumentKey::New,
                ReviewFields::new(self.user_id(), movie, rating, text),
            ),
        };

        let doc = self
            .scope
            .remote
            .put(Review::COLLECTION, key, fields.into_fields())
            .await
            .inspect_err(|e| {
                tracing::error!(movie_id = %movie.movie_id, error = %e, "Failed to save review")
            })?;
        let review = Review::from_document(&doc)?;
        self.scope
            .reviews
            .apply_local(|p| p.with_upsert(review.clone(), doc.revision));

        tracing::info!(
            review_id = %review.id,
            movie_id = %review.movie_id,
            rating = review.rating.get(),
            updated = existing.is_some(),
            "Review saved"
        );
        Ok(review)
    }

    /// Delete a review and every favorite for its movie.
    ///
    /// The delete is sent even for ids the projection does not hold; the
    /// remote ignores ids it does not know. Favorites are only cleaned up
    /// when the review's movie is known locally. A failing favorite cleanup
    /// is logged but does not fail the call.
    pub async fn remove(&self, review_id: &str) -> Result<()> {
        self.scope.ensure_open()?;

        let known = self.scope.reviews.current().get(review_id).cloned();

        let deleted = self
            .scope
            .remote
            .delete(Review::COLLECTION, review_id)
            .await
            .inspect_err(|e| tracing::error!(review_id, error = %e, "Failed to delete review"))?;

        let Some(review) = known else {
            // Whatever the remote removed reaches the projection through the
            // subscription.
            tracing::debug!(review_id, deleted = deleted.is_some(), "Review not in projection");
            return Ok(());
        };

        // A delete that removed nothing has no revision to order against.
        if let Some(revision) = deleted {
            self.scope
                .reviews
                .apply_local(|p| p.with_removed(review_id, revision));
        }
        tracing::info!(review_id, movie_id = %review.movie_id, "Review deleted");

        if let Err(err) = self.favorites().cascade_delete_for(&review.movie_id).await {
            tracing::warn!(
                review_id,
                movie_id = %review.movie_id,
                error = %err,
                "Favorite cleanup after review delete failed"
            );
        }
        Ok(())
    }

    /// Reviews, most recently updated first.
    pub fn list(&self) -> Vec<Review> {
        self.scope.reviews.current().to_vec()
    }

    pub fn get(&self, review_id: &str) -> Option<Review> {
        self.scope.reviews.current().get(review_id).cloned()
    }

    /// All reviews of one movie. The store does not enforce one per movie.
    pub fn for_movie(&self, movie_id: &str) -> Vec<Review> {
        self.scope
            .reviews
            .current()
            .by_movie(movie_id)
            .cloned()
            .collect()
    }

    /// Reactive view of the projection.
    pub fn watch(&self) -> watch::Receiver<Arc<Projection<Review>>> {
        self.scope.reviews.watch()
    }

    fn favorites(&self) -> FavoriteStore {
        FavoriteStore::new(Arc::clone(&self.scope))
    }
}
