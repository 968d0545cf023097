use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::store::EventStore;
use crate::error::AppResult;
use crate::models::{RatingEvent, RecommendationEvent, WatchEvent};

/// In-process event store used by tests and local runs without a database.
///
/// Same query semantics as the Postgres store: half-open time ranges,
/// strictly-after point queries, insertion order as the tie-break.
#[derive(Default)]
pub struct MemoryEventStore {
    watches: RwLock<Vec<WatchEvent>>,
    ratings: RwLock<Vec<RatingEvent>>,
    recommendations: RwLock<Vec<RecommendationEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_watch(&self, event: &WatchEvent) -> AppResult<()> {
        self.watches.write().await.push(event.clone());
        Ok(())
    }

    async fn insert_rating(&self, event: &RatingEvent) -> AppResult<()> {
        self.ratings.write().await.push(event.clone());
        Ok(())
    }

    async fn insert_recommendation(&self, event: &RecommendationEvent) -> AppResult<()> {
        self.recommendations.write().await.push(event.clone());
        Ok(())
    }

    async fn recommendations_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<RecommendationEvent>> {
        let recommendations = self.recommendations.read().await;
        Ok(recommendations
            .iter()
            .filter(|event| event.timestamp >= start && event.timestamp < end)
            .cloned()
            .collect())
    }

    async fn first_watch_after(
        &self,
        user_id: &str,
        after: DateTime<Utc>,
    ) -> AppResult<Option<WatchEvent>> {
        let watches = self.watches.read().await;
        Ok(watches
            .iter()
            .filter(|event| event.user_id == user_id && event.timestamp > after)
            .min_by_key(|event| event.timestamp)
            .cloned())
    }

    async fn first_rating_after(
        &self,
        user_id: &str,
        movie_id: &str,
        after: DateTime<Utc>,
    ) -> AppResult<Option<RatingEvent>> {
        let ratings = self.ratings.read().await;
        Ok(ratings
            .iter()
            .filter(|event| {
                event.user_id == user_id && event.movie_id == movie_id && event.timestamp > after
            })
            .min_by_key(|event| event.timestamp)
            .cloned())
    }
}
