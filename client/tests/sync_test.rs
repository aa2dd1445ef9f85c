//! Integration tests for the stores and the coordinator against the
//! in-memory remote.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reelmark_client::remote::RemoteResult;
use reelmark_client::{
    MemoryRemote, RemoteCollectionClient, RemoteError, Session, Subscription, SyncContext,
    SyncCoordinator, SyncError,
};
use reelmark_engine::{
    Document, DocumentKey, Entity, Favorite, FavoriteFields, Fields, Filter, MovieRef, Projection,
    Rating, Review, ReviewFields, Revision,
};
use tokio::sync::watch;

const SHAWSHANK: &str = "tt0111161";
const GODFATHER: &str = "tt0068646";

fn shawshank() -> MovieRef {
    MovieRef::new(SHAWSHANK, "The Shawshank Redemption")
        .with_year("1994")
        .with_poster("https://example.com/shawshank.jpg")
}

fn godfather() -> MovieRef {
    MovieRef::new(GODFATHER, "The Godfather").with_poster("N/A")
}

async fn started(remote: &MemoryRemote, user: &str) -> SyncCoordinator {
    let ctx = SyncContext::new(Arc::new(remote.clone()))
        .with_initial_snapshot_timeout(Duration::from_secs(1));
    let mut coordinator = SyncCoordinator::new(ctx);
    coordinator.start(Session::new(user)).await.unwrap();
    coordinator
}

/// Wait until the projection satisfies `done`.
async fn wait_for<T: Entity>(
    rx: &mut watch::Receiver<Arc<Projection<T>>>,
    done: impl Fn(&Projection<T>) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if done(&rx.borrow_and_update()) {
                return;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("projection never reached the expected state");
}

/// Wait until the remote holds `count` listeners.
async fn wait_for_listeners(remote: &MemoryRemote, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while remote.listener_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("listener count never settled");
}

/// Store a favorite as another device would.
async fn favorite_from_elsewhere(remote: &MemoryRemote, user: &str, movie: &MovieRef) -> Document {
    remote
        .put(
            Favorite::COLLECTION,
            DocumentKey::New,
            FavoriteFields::new(user, movie).into_fields(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn scenario_a_submit_creates_one_review() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    let saved = reviews
        .submit(&shawshank(), 9i64, "Great film", None)
        .await
        .unwrap();

    let list = reviews.list();
    assert_eq!(list.len(), 1);
    let review = &list[0];
    assert!(!review.id.is_empty());
    assert_eq!(review.id, saved.id);
    assert_eq!(review.user_id, "u1");
    assert_eq!(review.movie_id, SHAWSHANK);
    assert_eq!(review.movie_title, "The Shawshank Redemption");
    assert_eq!(review.poster_url.as_deref(), Some("https://example.com/shawshank.jpg"));
    assert_eq!(review.rating.get(), 9);
    assert_eq!(review.review_text, "Great film");
    assert_eq!(remote.documents("reviews").len(), 1);
}

#[tokio::test]
async fn scenario_b_double_toggle_leaves_nothing() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let favorites = coordinator.favorites().unwrap();

    assert!(favorites.toggle(&shawshank()).await.unwrap().added);
    assert!(favorites.contains(SHAWSHANK));
    assert!(!favorites.toggle(&shawshank()).await.unwrap().added);

    assert!(!favorites.contains(SHAWSHANK));
    assert!(remote.documents("favorites").is_empty());
}

#[tokio::test]
async fn scenario_c_removing_review_removes_favorite() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    let favorites = coordinator.favorites().unwrap();

    let review = reviews.submit(&godfather(), "10", "", None).await.unwrap();
    favorites.toggle(&godfather()).await.unwrap();
    assert!(favorites.contains(GODFATHER));

    reviews.remove(&review.id).await.unwrap();

    assert!(!favorites.contains(GODFATHER));
    assert!(reviews.list().is_empty());
    assert!(remote.documents("favorites").is_empty());
}

#[tokio::test]
async fn scenario_d_out_of_range_rating_never_writes() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    let err = reviews
        .submit(&shawshank(), "15", "too good", None)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(remote.write_count("reviews"), 0);
    assert!(reviews.list().is_empty());
}

#[tokio::test]
async fn rating_bounds_through_submit() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    for rating in -2i64..=13 {
        let result = reviews.submit(&shawshank(), rating, "", None).await;
        if (1..=10).contains(&rating) {
            assert_eq!(result.unwrap().rating.get() as i64, rating);
        } else {
            assert!(result.unwrap_err().is_validation(), "rating {rating}");
        }
    }
    for text in ["0", "11", "abc", "", "7.5"] {
        let err = reviews.submit(&shawshank(), text, "", None).await.unwrap_err();
        assert!(err.is_validation(), "input {text:?}");
    }
    assert_eq!(remote.write_count("reviews"), 10);
}

#[tokio::test]
async fn editing_keeps_movie_and_owner() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    let original = reviews.submit(&shawshank(), 6i64, "fine", None).await.unwrap();
    let other = MovieRef::new("tt9999999", "Something Else");
    let edited = reviews
        .submit(&other, "8", "grew on me", Some(original.id.as_str()))
        .await
        .unwrap();

    assert_eq!(edited.id, original.id);
    assert_eq!(edited.movie_id, SHAWSHANK);
    assert_eq!(edited.rating.get(), 8);
    assert_eq!(edited.review_text, "grew on me");
    assert_eq!(reviews.list().len(), 1);

    let err = reviews
        .submit(&shawshank(), 5i64, "", Some("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ReviewNotFound(id) if id == "missing"));
}

#[tokio::test]
async fn duplicate_reviews_are_kept() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    reviews.submit(&shawshank(), 9i64, "first", None).await.unwrap();
    reviews.submit(&shawshank(), 7i64, "second", None).await.unwrap();

    assert_eq!(reviews.for_movie(SHAWSHANK).len(), 2);
    // Most recently updated first.
    assert_eq!(reviews.list()[0].review_text, "second");
}

#[tokio::test]
async fn remove_twice_is_a_noop() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    let review = reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();
    reviews.remove(&review.id).await.unwrap();
    let writes = remote.write_count("reviews");

    reviews.remove(&review.id).await.unwrap();
    reviews.remove("never-existed").await.unwrap();

    assert_eq!(remote.write_count("reviews"), writes);
    assert!(reviews.list().is_empty());
}

#[tokio::test]
async fn cascade_holds_for_any_prior_favorite_state() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    let favorites = coordinator.favorites().unwrap();

    for (movie, favorited) in [(shawshank(), true), (godfather(), false)] {
        let review = reviews.submit(&movie, 5i64, "", None).await.unwrap();
        if favorited {
            favorites.toggle(&movie).await.unwrap();
        }
        reviews.remove(&review.id).await.unwrap();
        assert!(!favorites.contains(&movie.movie_id));
    }
}

#[tokio::test]
async fn cascade_reaches_favorites_not_yet_delivered() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();

    let review = reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();
    favorite_from_elsewhere(&remote, "u1", &shawshank()).await;
    favorite_from_elsewhere(&remote, "u2", &shawshank()).await;

    reviews.remove(&review.id).await.unwrap();

    let left = remote.documents("favorites");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].str_field("userId"), Some("u2"));
}

#[tokio::test]
async fn toggle_clears_duplicate_favorites() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let favorites = coordinator.favorites().unwrap();
    let mut rx = favorites.watch();

    favorite_from_elsewhere(&remote, "u1", &shawshank()).await;
    favorite_from_elsewhere(&remote, "u1", &shawshank()).await;
    wait_for(&mut rx, |p| p.len() == 2).await;

    let toggle = favorites.toggle(&shawshank()).await.unwrap();

    assert!(!toggle.added);
    assert!(!favorites.contains(SHAWSHANK));
    assert!(remote.documents("favorites").is_empty());
}

#[tokio::test]
async fn toggle_is_self_inverse() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let favorites = coordinator.favorites().unwrap();

    favorites.toggle(&godfather()).await.unwrap();
    for movie in [shawshank(), godfather()] {
        let before = favorites.contains(&movie.movie_id);
        let first = favorites.toggle(&movie).await.unwrap();
        let second = favorites.toggle(&movie).await.unwrap();
        assert_ne!(first.added, second.added);
        assert_eq!(favorites.contains(&movie.movie_id), before);
    }
    assert_eq!(remote.documents("favorites").len(), 1);
    assert!(favorites.list()[0].poster_url.is_none());
}

/// Remote that fails selected calls and passes the rest through.
#[derive(Default)]
struct FaultyRemote {
    inner: MemoryRemote,
    fail_favorite_deletes: bool,
    fail_reads: bool,
}

#[async_trait]
impl RemoteCollectionClient for FaultyRemote {
    async fn subscribe(&self, collection: &str, filter: Filter) -> RemoteResult<Subscription> {
        self.inner.subscribe(collection, filter).await
    }

    async fn get_many(&self, collection: &str, filter: &Filter) -> RemoteResult<Vec<Document>> {
        if self.fail_reads {
            return Err(RemoteError::Unavailable("reads are down".into()));
        }
        self.inner.get_many(collection, filter).await
    }

    async fn put(&self, collection: &str, key: DocumentKey, fields: Fields) -> RemoteResult<Document> {
        self.inner.put(collection, key, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<Option<Revision>> {
        if self.fail_favorite_deletes && collection == Favorite::COLLECTION {
            return Err(RemoteError::Unavailable("favorites are read-only".into()));
        }
        self.inner.delete(collection, id).await
    }
}

async fn started_on(remote: FaultyRemote, user: &str) -> SyncCoordinator {
    let mut coordinator = SyncCoordinator::new(SyncContext::new(Arc::new(remote)));
    coordinator.start(Session::new(user)).await.unwrap();
    coordinator
}

#[tokio::test]
async fn failed_cascade_does_not_fail_remove() {
    let remote = MemoryRemote::new();
    let coordinator = started_on(
        FaultyRemote {
            inner: remote.clone(),
            fail_favorite_deletes: true,
            ..Default::default()
        },
        "u1",
    )
    .await;
    let reviews = coordinator.reviews().unwrap();
    let favorites = coordinator.favorites().unwrap();

    let review = reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();
    favorites.toggle(&shawshank()).await.unwrap();

    reviews.remove(&review.id).await.unwrap();

    assert!(reviews.list().is_empty());
    assert!(remote.documents("reviews").is_empty());
    assert_eq!(remote.documents("favorites").len(), 1);
    assert!(favorites.toggle(&shawshank()).await.unwrap_err().is_unavailable());
}

#[tokio::test]
async fn cascade_deletes_known_favorites_when_lookup_fails() {
    let remote = MemoryRemote::new();
    let coordinator = started_on(
        FaultyRemote {
            inner: remote.clone(),
            fail_reads: true,
            ..Default::default()
        },
        "u1",
    )
    .await;
    let reviews = coordinator.reviews().unwrap();
    let favorites = coordinator.favorites().unwrap();

    let review = reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();
    favorites.toggle(&shawshank()).await.unwrap();
    reviews.remove(&review.id).await.unwrap();

    assert!(!favorites.contains(SHAWSHANK));
    assert!(remote.documents("favorites").is_empty());

    // Called directly, the lookup failure is still reported.
    favorites.toggle(&godfather()).await.unwrap();
    let err = favorites.cascade_delete_for(GODFATHER).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(!favorites.contains(GODFATHER));
    assert!(remote.documents("favorites").is_empty());
}

#[tokio::test]
async fn removing_an_already_deleted_review_keeps_later_changes() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    let mut rx = reviews.watch();

    let first = reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();

    // Another device deletes the review, writes a new one and a favorite
    // before this device's subscription catches up.
    remote.delete("reviews", &first.id).await.unwrap();
    let fields = ReviewFields::new("u1", &godfather(), Rating::new(8).unwrap(), "elsewhere");
    let second = remote
        .put(Review::COLLECTION, DocumentKey::New, fields.into_fields())
        .await
        .unwrap();
    favorite_from_elsewhere(&remote, "u1", &godfather()).await;

    reviews.remove(&first.id).await.unwrap();

    wait_for(&mut rx, |p| p.get(&second.id).is_some() && p.get(&first.id).is_none()).await;
    assert_eq!(reviews.list().len(), 1);

    let mut favorites_rx = coordinator.favorites().unwrap().watch();
    wait_for(&mut favorites_rx, |p| p.contains_movie(GODFATHER)).await;
}

#[tokio::test]
async fn remove_reaches_reviews_missing_from_the_projection() {
    let remote = MemoryRemote::new();
    let fields = serde_json::json!({
        "userId": "u1",
        "movieId": SHAWSHANK,
        "movieTitle": "The Shawshank Redemption",
        "rating": "excellent",
    });
    let serde_json::Value::Object(fields) = fields else {
        unreachable!()
    };
    let malformed = remote
        .put("reviews", DocumentKey::New, fields)
        .await
        .unwrap();

    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    assert!(reviews.get(&malformed.id).is_none());

    reviews.remove(&malformed.id).await.unwrap();

    assert!(remote.documents("reviews").is_empty());
}

#[tokio::test]
async fn remote_changes_reach_the_projection() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let favorites = coordinator.favorites().unwrap();
    let mut rx = favorites.watch();

    let doc = favorite_from_elsewhere(&remote, "u1", &godfather()).await;
    wait_for(&mut rx, |p| p.contains_movie(GODFATHER)).await;
    assert!(favorites.contains(GODFATHER));

    favorite_from_elsewhere(&remote, "u2", &shawshank()).await;
    remote.delete("favorites", &doc.id).await.unwrap();
    wait_for(&mut rx, |p| p.is_empty()).await;
    assert!(!favorites.contains(SHAWSHANK));
}

#[tokio::test]
async fn stop_cancels_everything() {
    let remote = MemoryRemote::new();
    let mut coordinator = started(&remote, "u1").await;
    assert_eq!(remote.listener_count(), 2);

    let favorites = coordinator.favorites().unwrap();
    let mut rx = favorites.watch();
    rx.borrow_and_update();

    coordinator.stop().await;
    assert_eq!(remote.listener_count(), 0);
    assert!(!coordinator.is_active());

    favorite_from_elsewhere(&remote, "u1", &shawshank()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!rx.has_changed().unwrap());
    assert!(!favorites.contains(SHAWSHANK));

    assert!(matches!(
        favorites.toggle(&shawshank()).await,
        Err(SyncError::SessionEnded)
    ));
    assert!(matches!(coordinator.reviews(), Err(SyncError::NoSession)));

    // Stopping again is harmless.
    coordinator.stop().await;
}

#[tokio::test]
async fn drop_cancels_subscriptions() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    assert_eq!(remote.listener_count(), 2);

    drop(coordinator);

    assert_eq!(remote.listener_count(), 0);
    assert!(matches!(
        reviews.submit(&shawshank(), 5i64, "", None).await,
        Err(SyncError::SessionEnded)
    ));
}

#[tokio::test]
async fn switching_users_resubscribes() {
    let remote = MemoryRemote::new();
    let mut coordinator = started(&remote, "u1").await;
    let u1_reviews = coordinator.reviews().unwrap();
    u1_reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();

    // Same user again changes nothing.
    coordinator.start(Session::new("u1")).await.unwrap();
    assert_eq!(coordinator.reviews().unwrap().list().len(), 1);

    coordinator.start(Session::new("u2")).await.unwrap();
    assert_eq!(coordinator.active_user(), Some("u2"));
    assert_eq!(remote.listener_count(), 2);

    let u2_reviews = coordinator.reviews().unwrap();
    assert!(u2_reviews.list().is_empty());
    assert_eq!(u2_reviews.user_id(), "u2");
    assert!(matches!(
        u1_reviews.remove("anything").await,
        Err(SyncError::SessionEnded)
    ));
}

#[tokio::test]
async fn run_follows_the_session_provider() {
    let remote = MemoryRemote::new();
    let coordinator = SyncCoordinator::new(SyncContext::new(Arc::new(remote.clone())));
    let (tx, rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut coordinator = coordinator;
        coordinator.run(rx).await;
        coordinator
    });

    tx.send(Some(Session::new("u1"))).unwrap();
    wait_for_listeners(&remote, 2).await;

    tx.send(None).unwrap();
    wait_for_listeners(&remote, 0).await;

    tx.send(Some(Session::new("u2"))).unwrap();
    wait_for_listeners(&remote, 2).await;

    drop(tx);
    let coordinator = task.await.unwrap();
    assert!(!coordinator.is_active());
    assert_eq!(remote.listener_count(), 0);
}

#[tokio::test]
async fn start_fails_when_remote_is_offline() {
    let remote = MemoryRemote::new();
    remote.set_available(false);
    let mut coordinator = SyncCoordinator::new(SyncContext::new(Arc::new(remote.clone())));

    let err = coordinator.start(Session::new("u1")).await.unwrap_err();

    assert!(err.is_unavailable());
    assert!(!coordinator.is_active());
    assert_eq!(remote.listener_count(), 0);
}

#[tokio::test]
async fn slow_remote_times_out_as_unavailable() {
    let remote = MemoryRemote::new();
    let bounded = reelmark_client::TimeoutRemote::new(remote.clone(), Duration::from_millis(20));
    let mut coordinator = SyncCoordinator::new(SyncContext::new(Arc::new(bounded)));
    coordinator.start(Session::new("u1")).await.unwrap();
    let reviews = coordinator.reviews().unwrap();

    remote.set_latency(Duration::from_millis(200));
    let err = reviews
        .submit(&shawshank(), 9i64, "", None)
        .await
        .unwrap_err();

    assert!(err.is_unavailable());
    assert!(reviews.list().is_empty());
}

#[tokio::test]
async fn permission_denied_surfaces() {
    let remote = MemoryRemote::new();
    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    let favorites = coordinator.favorites().unwrap();

    remote.deny_user("u1");

    let err = reviews.submit(&shawshank(), 9i64, "", None).await.unwrap_err();
    assert!(err.is_permission_denied());
    let err = favorites.toggle(&shawshank()).await.unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(remote.write_count("reviews"), 0);
    assert_eq!(remote.write_count("favorites"), 0);
}

#[tokio::test]
async fn malformed_documents_are_skipped() {
    let remote = MemoryRemote::new();
    let fields = serde_json::json!({
        "userId": "u1",
        "movieId": SHAWSHANK,
        "movieTitle": "The Shawshank Redemption",
        "rating": "excellent",
    });
    let serde_json::Value::Object(fields) = fields else {
        unreachable!()
    };
    remote
        .put("reviews", DocumentKey::New, fields)
        .await
        .unwrap();

    let coordinator = started(&remote, "u1").await;
    let reviews = coordinator.reviews().unwrap();
    assert!(reviews.list().is_empty());

    reviews.submit(&shawshank(), 9i64, "", None).await.unwrap();
    assert_eq!(reviews.list().len(), 1);
}
