use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::store::EventStore;
use crate::error::AppResult;
use crate::models::{RatingEvent, RecommendationEvent, WatchEvent};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Postgres-backed event store.
///
/// One table per event category (see `migrations/`). Earliest-after queries
/// order by `(timestamp, id)` so ties resolve deterministically in insertion
/// order.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventStore for PgEventStore {
    async fn insert_watch(&self, event: &WatchEvent) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO watch_events (user_id, movie_id, timestamp, minute) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&event.user_id)
        .bind(&event.movie_id)
        .bind(event.timestamp)
        .bind(event.minute)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_rating(&self, event: &RatingEvent) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO rating_events (user_id, movie_id, timestamp, rating) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&event.user_id)
        .bind(&event.movie_id)
        .bind(event.timestamp)
        .bind(event.rating)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_recommendation(&self, event: &RecommendationEvent) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO recommendation_events (user_id, recommended_movies, timestamp) \
             VALUES ($1, $2, $3)",
        )
        .bind(&event.user_id)
        .bind(&event.recommended_movies)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recommendations_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<RecommendationEvent>> {
        let events = sqlx::query_as::<_, RecommendationEvent>(
            "SELECT user_id, recommended_movies, timestamp \
             FROM recommendation_events \
             WHERE timestamp >= $1 AND timestamp < $2 \
             ORDER BY timestamp, id",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn first_watch_after(
        &self,
        user_id: &str,
        after: DateTime<Utc>,
    ) -> AppResult<Option<WatchEvent>> {
        let event = sqlx::query_as::<_, WatchEvent>(
            "SELECT user_id, movie_id, timestamp, minute \
             FROM watch_events \
             WHERE user_id = $1 AND timestamp > $2 \
             ORDER BY timestamp, id \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(after)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn first_rating_after(
        &self,
        user_id: &str,
        movie_id: &str,
        after: DateTime<Utc>,
    ) -> AppResult<Option<RatingEvent>> {
        let event = sqlx::query_as::<_, RatingEvent>(
            "SELECT user_id, movie_id, timestamp, rating \
             FROM rating_events \
             WHERE user_id = $1 AND movie_id = $2 AND timestamp > $3 \
             ORDER BY timestamp, id \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(after)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }
}
