use std::collections::HashMap;
use std::sync::Arc;

use axum_test::TestServer;
use serde_json::Value;

use recolog::api::{create_router, AppState};
use recolog::db::{create_redis_client, MemoryEventStore, PredictionCache};
use recolog::services::model::{ModelArtifact, MovieFactors, SvdRecommender, UserFactors};

fn test_artifact() -> ModelArtifact {
    let movies = (0..30)
        .map(|i| MovieFactors {
            title: format!("movie {i}"),
            bias: 0.0,
            factors: vec![i as f64 * 0.1],
        })
        .collect();

    let mut users = HashMap::new();
    users.insert(42, UserFactors { bias: 0.2, factors: vec![1.0] });

    ModelArtifact { global_mean: 3.5, users, movies }
}

fn create_test_server() -> TestServer {
    let store = Arc::new(MemoryEventStore::new());
    let recommender = Arc::new(SvdRecommender::from_artifact(test_artifact()));
    // Nothing listens on this port: every cache call degrades to computing.
    let redis_client = create_redis_client("redis://127.0.0.1:6390").unwrap();
    let cache = Arc::new(PredictionCache::new(redis_client));

    let state = AppState::new(store, recommender, cache);
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn recommendation_line(timestamp: &str, user_id: &str, movies: &[String]) -> String {
    format!(
        "{timestamp},{user_id},recommendation request fireflyserver,status 200,{}",
        movies.join(",")
    )
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_recommend_known_user() {
    let server = create_test_server();

    let response = server.get("/recommend/42").await;
    response.assert_status_ok();

    let body = response.text();
    let movies: Vec<&str> = body.split(',').collect();
    assert_eq!(movies.len(), 20);
    // Highest predicted rating first; spaces wire-formatted as '+'.
    assert_eq!(movies[0], "movie+29");
}

#[tokio::test]
async fn test_recommend_unknown_user_falls_back_to_catalog() {
    let server = create_test_server();

    let response = server.get("/recommend/777").await;
    response.assert_status_ok();

    let body = response.text();
    let movies: Vec<&str> = body.split(',').collect();
    assert_eq!(movies.len(), 20);
    for movie in movies {
        assert!(movie.starts_with("movie+"));
    }
}

#[tokio::test]
async fn test_recommend_rejects_out_of_range_and_malformed_ids() {
    let server = create_test_server();

    for user_id in ["0", "1000001", "-5", "abc"] {
        let response = server.get(&format!("/recommend/{user_id}")).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    // Boundary values are valid.
    server.get("/recommend/1").await.assert_status_ok();
    server.get("/recommend/1000000").await.assert_status_ok();
}

#[tokio::test]
async fn test_telemetry_ingests_good_lines_and_drops_bad_ones() {
    let server = create_test_server();
    let movies: Vec<String> = (1..=20).map(|i| format!("movie{i}")).collect();

    let payload = format!(
        "2024-03-15T13:23:19,123,/data/movie/movie3/5.mpg\n\
         2024-03-15T13:25:00,123,/rate/movie/movie3=4\n\
         {}\n\
         garbage line\n\
         2024-03-15T13:30:00,456,/data/movie/movie9/notanumber.mpg\n",
        recommendation_line("2024-03-15T12:00:00.123456", "123", &movies)
    );

    let response = server.post("/telemetry").text(payload).await;
    response.assert_status_ok();

    let report: Value = response.json();
    assert_eq!(report["ingested"], 3);
    assert_eq!(report["dropped"], 2);
}

#[tokio::test]
async fn test_war_day_scores_watched_and_rated_recommendation() {
    let server = create_test_server();
    let movies: Vec<String> = (1..=20).map(|i| format!("movie{i}")).collect();

    let payload = format!(
        "{}\n\
         2024-03-15T12:30:00,123,/data/movie/movie3/0.mpg\n\
         2024-03-15T13:00:00,123,/rate/movie/movie3=4\n",
        recommendation_line("2024-03-15T12:00:00.123456", "123", &movies)
    );
    server.post("/telemetry").text(payload).await.assert_status_ok();

    let response = server.get("/metrics/war/2024-03-15").await;
    response.assert_status_ok();

    let metric: Value = response.json();
    assert_eq!(metric["date"], "2024-03-15");
    assert_eq!(metric["score"], 4.0);
    assert_eq!(metric["recommendations"], 1);
}

#[tokio::test]
async fn test_war_day_never_watched_scores_one() {
    let server = create_test_server();
    let movies: Vec<String> = (1..=20).map(|i| format!("movie{i}")).collect();

    let payload = format!(
        "{}\n{}\n",
        recommendation_line("2024-03-15T10:00:00", "1", &movies),
        recommendation_line("2024-03-15T11:00:00", "2", &movies)
    );
    server.post("/telemetry").text(payload).await.assert_status_ok();

    let response = server.get("/metrics/war/2024-03-15").await;
    let metric: Value = response.json();
    assert_eq!(metric["score"], 1.0);
    assert_eq!(metric["recommendations"], 2);
}

#[tokio::test]
async fn test_war_day_without_recommendations_is_null() {
    let server = create_test_server();

    let response = server.get("/metrics/war/2024-03-15").await;
    response.assert_status_ok();

    let metric: Value = response.json();
    assert_eq!(metric["score"], Value::Null);
    assert_eq!(metric["recommendations"], 0);
}

#[tokio::test]
async fn test_war_day_rejects_malformed_date() {
    let server = create_test_server();

    let response = server.get("/metrics/war/March-15").await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_war_period_reports_days_and_summary() {
    let server = create_test_server();
    let movies: Vec<String> = (1..=20).map(|i| format!("movie{i}")).collect();

    // The 15th scores 4.0; the 16th has no recommendations.
    let payload = format!(
        "{}\n\
         2024-03-15T12:30:00,123,/data/movie/movie3/0.mpg\n\
         2024-03-15T13:00:00,123,/rate/movie/movie3=4\n",
        recommendation_line("2024-03-15T12:00:00", "123", &movies)
    );
    server.post("/telemetry").text(payload).await.assert_status_ok();

    let response = server
        .get("/metrics/war")
        .add_query_param("start", "2024-03-15")
        .add_query_param("end", "2024-03-16")
        .await;
    response.assert_status_ok();

    let report: Value = response.json();
    let days = report["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["score"], 4.0);
    // Undefined day stays null per-day but enters the summary as 0.
    assert_eq!(days[1]["score"], Value::Null);
    assert_eq!(report["summary"]["min"], 0.0);
    assert_eq!(report["summary"]["max"], 4.0);
    assert_eq!(report["summary"]["mean"], 2.0);
}

#[tokio::test]
async fn test_war_period_empty_range_has_no_summary() {
    let server = create_test_server();

    let response = server
        .get("/metrics/war")
        .add_query_param("start", "2024-03-16")
        .add_query_param("end", "2024-03-15")
        .await;
    response.assert_status_ok();

    let report: Value = response.json();
    assert_eq!(report["days"].as_array().unwrap().len(), 0);
    assert_eq!(report["summary"], Value::Null);
}

#[tokio::test]
async fn test_request_metrics_track_recommend_traffic() {
    let server = create_test_server();

    server.get("/recommend/42").await.assert_status_ok();
    server.get("/recommend/42").await.assert_status_ok();
    server
        .get("/recommend/0")
        .await
        .assert_status(axum::http::StatusCode::BAD_REQUEST);
    // Other routes do not feed the counters.
    server.get("/health").await.assert_status_ok();

    let response = server.get("/metrics/requests").await;
    response.assert_status_ok();

    let snapshot: Value = response.json();
    assert_eq!(snapshot["total_requests"], 3);
    assert_eq!(snapshot["invalid_responses"], 1);
    // The known user's list is deterministic, so repeats are one response.
    assert_eq!(snapshot["unique_responses"], 1);
    assert_eq!(snapshot["unique_rate"], 0.5);
}
