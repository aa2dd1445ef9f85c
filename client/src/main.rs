//! Reelmark - terminal front end for the sync layer.
//!
//! Runs a session against an in-process store and reads commands from
//! stdin. Useful for poking at the stores by hand; type `help` for the list.

use std::collections::HashMap;
use std::sync::Arc;

use reelmark_client::{
    CatalogSearch, Config, MemoryRemote, OmdbCatalog, Session, SyncContext, SyncCoordinator,
    TimeoutRemote,
};
use reelmark_engine::{MovieId, MovieRef};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  search <text>                   search the catalog
  review <movieId> <rating> [text] review a movie
  edit <reviewId> <rating> [text]  revise a review
  rm <reviewId>                    delete a review and its favorites
  fav <movieId>                    toggle a favorite
  reviews | favorites              list your data
  login <user> | logout            switch session
  quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelmark_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(user_id = %config.user_id, "Starting Reelmark");

    let remote = TimeoutRemote::new(MemoryRemote::new(), config.remote_timeout);
    let ctx = SyncContext::new(Arc::new(remote)).with_initial_snapshot_timeout(config.remote_timeout);
    let mut coordinator = SyncCoordinator::new(ctx);
    coordinator.start(Session::new(config.user_id.clone())).await?;

    let catalog = config
        .omdb_api_key
        .as_ref()
        .map(|key| OmdbCatalog::with_base_url(key.clone(), config.omdb_base_url.clone()));
    if catalog.is_none() {
        tracing::warn!("OMDB_API_KEY not set, catalog search disabled");
    }

    let mut known: HashMap<MovieId, MovieRef> = HashMap::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        let outcome = match (command, args.as_slice()) {
            ("quit" | "exit", _) => break,
            ("help", _) => {
                println!("{HELP}");
                Ok(())
            }
            ("search", query) if !query.is_empty() => match &catalog {
                Some(catalog) => catalog.search(&query.join(" ")).await.map(|movies| {
                    for movie in movies {
                        println!(
                            "{}  {} ({})",
                            movie.movie_id,
                            movie.title,
                            movie.year.as_deref().unwrap_or("?")
                        );
                        known.insert(movie.movie_id.clone(), movie);
                    }
                }),
                None => {
                    println!("search is disabled");
                    Ok(())
                }
            },
            ("review", [movie_id, rating, text @ ..]) => {
                let movie = movie_ref(&known, movie_id);
                match coordinator.reviews() {
                    Ok(store) => store
                        .submit(&movie, *rating, text.join(" "), None)
                        .await
                        .map(|r| println!("saved {}", r.id)),
                    Err(e) => Err(e),
                }
            }
            ("edit", [review_id, rating, text @ ..]) => match coordinator.reviews() {
                Ok(store) => match store.get(review_id) {
                    Some(existing) => {
                        let movie = MovieRef::new(existing.movie_id, existing.movie_title);
                        store
                            .submit(&movie, *rating, text.join(" "), Some(*review_id))
                            .await
                            .map(|r| println!("updated {}", r.id))
                    }
                    None => {
                        println!("no review {review_id}");
                        Ok(())
                    }
                },
                Err(e) => Err(e),
            },
            ("rm", [review_id]) => match coordinator.reviews() {
                Ok(store) => store.remove(review_id).await,
                Err(e) => Err(e),
            },
            ("fav", [movie_id]) => {
                let movie = movie_ref(&known, movie_id);
                match coordinator.favorites() {
                    Ok(store) => store.toggle(&movie).await.map(|t| {
                        println!("{}", if t.added { "added" } else { "removed" })
                    }),
                    Err(e) => Err(e),
                }
            }
            ("reviews", []) => coordinator.reviews().map(|store| {
                for r in store.list() {
                    println!("{}  {}  {}/10  {}", r.id, r.movie_title, r.rating, r.review_text);
                }
            }),
            ("favorites", []) => coordinator.favorites().map(|store| {
                for f in store.list() {
                    println!("{}  {}", f.movie_id, f.movie_title);
                }
            }),
            ("login", [user]) => coordinator.start(Session::new(*user)).await,
            ("logout", []) => {
                coordinator.stop().await;
                Ok(())
            }
            _ => {
                println!("unknown command, try `help`");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("error: {e}");
        }
    }

    coordinator.stop().await;
    tracing::info!("Reelmark stopped");
    Ok(())
}

/// Movie for an id, from earlier search results if we have them.
fn movie_ref(known: &HashMap<MovieId, MovieRef>, movie_id: &str) -> MovieRef {
    known
        .get(movie_id)
        .cloned()
        .unwrap_or_else(|| MovieRef::new(movie_id, movie_id))
}
