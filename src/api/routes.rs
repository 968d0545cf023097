use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware, track_responses};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    // Only the recommend route feeds the serving-quality counters.
    let recommend = Router::new()
        .route("/recommend/:user_id", get(handlers::recommend))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            track_responses,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(recommend)
        // Telemetry write path
        .route("/telemetry", post(handlers::ingest_telemetry))
        // Online quality metrics
        .route("/metrics/war", get(handlers::period_war))
        .route("/metrics/war/:date", get(handlers::daily_war))
        .route("/metrics/requests", get(handlers::request_metrics))
        .layer(
            TraceLayer::new_for_http().make_span_with(make_span_with_request_id),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
