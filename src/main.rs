use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use recolog::api::{create_router, AppState};
use recolog::config::Config;
use recolog::db::{create_pool, create_redis_client, PgEventStore, PredictionCache};
use recolog::services::SvdRecommender;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    // Event store
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("running event store migrations")?;
    let store = Arc::new(PgEventStore::new(pool));

    // Prediction cache
    let redis_client = create_redis_client(&config.redis_url)?;
    let cache = Arc::new(PredictionCache::new(redis_client));

    // Recommendation model
    let recommender = SvdRecommender::load(Path::new(&config.model_path))
        .context("loading recommendation model artifact")?;

    let state = AppState::new(store, Arc::new(recommender), cache);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "recolog listening");
    axum::serve(listener, app).await?;

    Ok(())
}
