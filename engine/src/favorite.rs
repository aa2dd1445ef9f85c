//! Favorites: a user's bookmark of one movie.

use crate::{
    error::Result, normalize_poster, Document, DocumentId, Entity, Fields, MovieId, MovieRef,
    Timestamp, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The client-written fields of a favorite document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteFields {
    pub user_id: UserId,
    pub movie_id: MovieId,
    #[serde(default)]
    pub movie_title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl FavoriteFields {
    pub fn new(user_id: impl Into<UserId>, movie: &MovieRef) -> Self {
        Self {
            user_id: user_id.into(),
            movie_id: movie.movie_id.clone(),
            movie_title: movie.title.clone(),
            poster_url: normalize_poster(movie.poster_url.clone()),
        }
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
        fields
    }
}

/// A persisted favorite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: DocumentId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub movie_title: String,
    pub poster_url: Option<String>,
    /// Server-assigned creation time
    pub added_at: Timestamp,
}

impl Entity for Favorite {
    const COLLECTION: &'static str = "favorites";

    fn from_document(doc: &Document) -> Result<Self> {
        let fields: FavoriteFields = doc.decode(Self::COLLECTION)?;
        Ok(Self {
            id: doc.id.clone(),
            user_id: fields.user_id,
            movie_id: fields.movie_id,
            movie_title: fields.movie_title,
            poster_url: normalize_poster(fields.poster_url),
            added_at: doc.create_time,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn movie_id(&self) -> &str {
        &self.movie_id
    }

    fn sort_key(&self) -> Timestamp {
        self.added_at
    }
}
