use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

/// How long a user's served recommendation list stays cached, in seconds.
/// Short enough that model artifact swaps propagate quickly.
const PREDICTION_TTL: u64 = 300;

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Per-user cache of served recommendation lists.
///
/// Callers treat every error here as degradable: a cache failure is logged
/// and the prediction recomputed, never surfaced to the user.
#[derive(Clone)]
pub struct PredictionCache {
    redis_client: Client,
}

impl PredictionCache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    fn cache_key(user_id: i64) -> String {
        format!("rec:{}", user_id)
    }

    /// Attempts to retrieve a cached recommendation list for the user.
    pub async fn get(&self, user_id: i64) -> AppResult<Option<Vec<String>>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let cached: Option<String> = conn.get(Self::cache_key(user_id)).await?;

        match cached {
            Some(json) => {
                let movies: Vec<String> = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                tracing::debug!(user_id, "Prediction cache hit");
                Ok(Some(movies))
            }
            None => {
                tracing::debug!(user_id, "Prediction cache miss");
                Ok(None)
            }
        }
    }

    /// Stores a served recommendation list with a TTL.
    pub async fn put(&self, user_id: i64, movies: &[String]) -> AppResult<()> {
        let json = serde_json::to_string(movies)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let _: () = conn
            .set_ex(Self::cache_key(user_id), json, PREDICTION_TTL)
            .await?;

        tracing::debug!(user_id, ttl = PREDICTION_TTL, "Cached prediction");

        Ok(())
    }
}
