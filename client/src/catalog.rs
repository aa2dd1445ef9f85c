//! Movie catalog search over the OMDb HTTP API.

use async_trait::async_trait;
use reelmark_engine::{normalize_poster, MovieRef};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Shorter queries are not sent to the catalog.
pub const MIN_QUERY_LEN: usize = 3;

/// Default OMDb endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com/";

/// Something that turns a free-text query into movies.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<MovieRef>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResponse {
    response: String,
    #[serde(default)]
    search: Vec<SearchItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
}

impl From<SearchItem> for MovieRef {
    fn from(item: SearchItem) -> Self {
        MovieRef {
            movie_id: item.imdb_id,
            title: item.title,
            year: item.year,
            poster_url: normalize_poster(item.poster),
        }
    }
}

/// [`CatalogSearch`] backed by OMDb.
#[derive(Clone)]
pub struct OmdbCatalog {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OmdbCatalog {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for OmdbCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmdbCatalog")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogSearch for OmdbCatalog {
    async fn search(&self, query: &str) -> Result<Vec<MovieRef>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("s", query),
                ("type", "movie"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(query, error = %e, "Catalog request failed");
                SyncError::Catalog(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(query, %status, "Catalog returned an error status");
            return Err(SyncError::Catalog(format!("{status} - {body}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Catalog(e.to_string()))?;
        let movies = into_movies(body);
        tracing::debug!(query, results = movies.len(), "Catalog search");
        Ok(movies)
    }
}

fn into_movies(body: SearchResponse) -> Vec<MovieRef> {
    if body.response != "True" {
        tracing::debug!(reason = body.error.as_deref().unwrap_or("unknown"), "No catalog results");
        return Vec::new();
    }
    body.search.into_iter().map(MovieRef::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<MovieRef> {
        into_movies(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn parses_search_results() {
        let movies = parse(
            r#"{
                "Search": [
                    {"Title": "Alien", "Year": "1979", "imdbID": "tt0078748", "Type": "movie",
                     "Poster": "https://example.com/alien.jpg"},
                    {"Title": "Aliens", "Year": "1986", "imdbID": "tt0090605", "Type": "movie",
                     "Poster": "N/A"}
                ],
                "totalResults": "2",
                "Response": "True"
            }"#,
        );

        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].movie_id, "tt0078748");
        assert_eq!(movies[0].year.as_deref(), Some("1979"));
        assert_eq!(movies[0].poster_url.as_deref(), Some("https://example.com/alien.jpg"));
        assert_eq!(movies[1].poster_url, None);
    }

    #[test]
    fn false_response_is_empty() {
        let movies = parse(r#"{"Response": "False", "Error": "Movie not found!"}"#);
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn short_queries_skip_the_request() {
        // Unroutable base URL: any request would fail.
        let catalog = OmdbCatalog::with_base_url("key", "http://127.0.0.1:9/");
        assert!(catalog.search("ab").await.unwrap().is_empty());
        assert!(catalog.search("  x ").await.unwrap().is_empty());
    }
}
