use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::MetricsSnapshot;
use crate::services::{ingest, performance, DailyMetric, IngestReport, PeriodReport};

use super::AppState;

/// Valid user id range for the recommend endpoint.
const MIN_USER_ID: i64 = 1;
const MAX_USER_ID: i64 = 1_000_000;

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Serves the top-20 recommendation list for a user as a comma-joined
/// plain-text body.
///
/// The user id must be an integer in [1, 1_000_000]; anything else is a 400.
/// Served lists are cached per user; cache failures degrade to recomputing
/// and are never user-visible.
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<String> {
    let user_id: i64 = user_id
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("user id must be an integer: {user_id}")))?;
    if !(MIN_USER_ID..=MAX_USER_ID).contains(&user_id) {
        return Err(AppError::InvalidInput(format!(
            "user id out of range: {user_id}"
        )));
    }

    match state.cache.get(user_id).await {
        Ok(Some(movies)) => return Ok(movies.join(",")),
        Ok(None) => {}
        Err(error) => tracing::warn!(%error, user_id, "Prediction cache read failed"),
    }

    let movies = state.recommender.predict_top_movies(user_id)?;

    if let Err(error) = state.cache.put(user_id, &movies).await {
        tracing::warn!(%error, user_id, "Prediction cache write failed");
    }

    Ok(movies.join(","))
}

/// Ingests a newline-delimited batch of raw access-log lines.
///
/// Unparseable lines are dropped and counted; a store failure fails the
/// request with 500.
pub async fn ingest_telemetry(
    State(state): State<AppState>,
    body: String,
) -> AppResult<Json<IngestReport>> {
    let report = ingest::ingest_lines(state.store.as_ref(), &body).await?;
    Ok(Json(report))
}

/// Daily recommendation-quality score for one calendar day.
pub async fn daily_war(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> AppResult<Json<DailyMetric>> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput(format!("date must be YYYY-MM-DD: {date}")))?;

    let metric = performance::calculate_metric_for_day(state.store.as_ref(), date).await?;
    Ok(Json(metric))
}

/// Per-day scores plus min/max/mean over an inclusive date range.
pub async fn period_war(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> AppResult<Json<PeriodReport>> {
    let report =
        performance::war_over_period(state.store.as_ref(), query.start, query.end).await?;
    Ok(Json(report))
}

/// Current request-metrics counters for the recommend route.
pub async fn request_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
