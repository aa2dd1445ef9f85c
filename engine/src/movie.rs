//! Catalog references to movies.

use crate::MovieId;
use serde::{Deserialize, Serialize};

/// Placeholder the catalog uses when it has no poster.
const NO_POSTER: &str = "N/A";

/// Normalize a catalog poster value: `"N/A"` and blank strings mean no poster.
pub fn normalize_poster(poster: Option<String>) -> Option<String> {
    poster.filter(|p| {
        let p = p.trim();
        !p.is_empty() && p != NO_POSTER
    })
}

/// A movie as returned by catalog search.
///
/// Reviews and favorites copy the title and poster at creation time, so a
/// `MovieRef` is all they need from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRef {
    /// External catalog id (e.g. `tt0111161`)
    pub movie_id: MovieId,
    /// Display title
    pub title: String,
    /// Release year as reported by the catalog (may be a range like `2010-2013`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Poster URL, absent when the catalog has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

impl MovieRef {
    /// Create a reference without year or poster.
    pub fn new(movie_id: impl Into<MovieId>, title: impl Into<String>) -> Self {
        Self {
            movie_id: movie_id.into(),
            title: title.into(),
            year: None,
            poster_url: None,
        }
    }

    /// Set the release year.
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    /// Set the poster, normalizing the catalog's placeholder value.
    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster_url = normalize_poster(Some(poster.into()));
        self
    }
}
