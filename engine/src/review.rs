//! Reviews: one user's rating and text for one movie.

use crate::{
    error::Result, normalize_poster, Document, DocumentId, Entity, Fields, MovieId, MovieRef,
    Rating, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The client-written fields of a review document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFields {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub movie_title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    pub rating: Rating,
    #[serde(default, alias = "review")]
    pub review_text: String,
}

impl ReviewFields {
    /// Fields for a new review, copying title and poster from the catalog.
    pub fn new(
        user_id: impl Into<UserId>,
        movie: &MovieRef,
        rating: Rating,
        review_text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            movie_id: movie.movie_id.clone(),
            movie_title: movie.title.clone(),
            poster_url: normalize_poster(movie.poster_url.clone()),
            rating,
            review_text: review_text.into(),
        }
    }

    /// Replace rating and text, keeping owner and movie.
    pub fn revise(mut self, rating: Rating, review_text: impl Into<String>) -> Self {
        self.rating = rating;
        self.review_text = review_text.into();
        self
    }

    /// Convert into the field map written to the store.
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("userId".into(), Value::from(self.user_id));
        fields.insert("movieId".into(), Value::from(self.movie_id));
        fields.insert("movieTitle".into(), Value::from(self.movie_title));
        fields.insert(
            "posterUrl".into(),
            self.poster_url.map_or(Value::Null, Value::from),
        );
        fields.insert("rating".into(), Value::from(self.rating.get()));
        fields.insert("reviewText".into(), Value::from(self.review_text));
        fields
    }
}

/// A persisted review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: DocumentId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub movie_title: String,
    pub poster_url: Option<String>,
    pub rating: Rating,
    pub review_text: String,
    /// Server-assigned time of the last write
    pub updated_at: Timestamp,
}

impl Review {
    /// The writable fields of this review.
    pub fn fields(&self) -> ReviewFields {
        ReviewFields {
            user_id: self.user_id.clone(),
            movie_id: self.movie_id.clone(),
            movie_title: self.movie_title.clone(),
            poster_url: self.poster_url.clone(),
            rating: self.rating,
            review_text: self.review_text.clone(),
        }
    }
}

impl Entity for Review {
    const COLLECTION: &'static str = "reviews";

    fn from_document(doc: &Document) -> Result<Self> {
        let fields: ReviewFields = doc.decode(Self::COLLECTION)?;
        Ok(Self {
            id: doc.id.clone(),
            user_id: fields.user_id,
            movie_id: fields.movie_id,
            movie_title: fields.movie_title,
            poster_url: normalize_poster(fields.poster_url),
            rating: fields.rating,
            review_text: fields.review_text,
            updated_at: doc.update_time,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn movie_id(&self) -> &str {
        &self.movie_id
    }

    fn sort_key(&self) -> Timestamp {
        self.updated_at
    }
}
