use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{RatingEvent, RecommendationEvent, WatchEvent};

/// The event-persistence collaborator: three append-only collections with
/// time-range and earliest-after queries.
///
/// Writers may run concurrently (one per request-handling context); readers
/// assume read-after-write visibility. Connectivity failures surface as
/// `AppError::Store` and abort the in-flight operation; retry policy, if
/// any, belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one watch event. No uniqueness constraint.
    async fn insert_watch(&self, event: &WatchEvent) -> AppResult<()>;

    /// Appends one rating event.
    async fn insert_rating(&self, event: &RatingEvent) -> AppResult<()>;

    /// Appends one recommendation event.
    async fn insert_recommendation(&self, event: &RecommendationEvent) -> AppResult<()>;

    /// All recommendation events with `start <= timestamp < end`.
    async fn recommendations_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<RecommendationEvent>>;

    /// The user's earliest watch event strictly after `after`, if any.
    /// Timestamp ties resolve in store insertion order.
    async fn first_watch_after(
        &self,
        user_id: &str,
        after: DateTime<Utc>,
    ) -> AppResult<Option<WatchEvent>>;

    /// The user's earliest rating of `movie_id` strictly after `after`, if any.
    async fn first_rating_after(
        &self,
        user_id: &str,
        movie_id: &str,
        after: DateTime<Utc>,
    ) -> AppResult<Option<RatingEvent>>;
}
