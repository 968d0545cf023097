use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::api::AppState;

/// Request counts at which a snapshot is flushed to the log.
const FLUSH_THRESHOLDS: [u64; 3] = [1000, 2000, 5000];

/// Serving-quality counters for the recommend route.
///
/// Owned by the application state and reset with the process; no
/// module-level globals. Distinct response bodies are tracked by sha256
/// digest, so memory stays bounded by the distinct-response count.
#[derive(Default)]
pub struct RequestMetrics {
    total_requests: AtomicU64,
    invalid_responses: AtomicU64,
    unique_responses: Mutex<HashSet<[u8; 32]>>,
}

/// Read-only view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub invalid_responses: u64,
    pub unique_responses: usize,
    /// Distinct responses per successful response; `None` until a request
    /// has succeeded.
    pub unique_rate: Option<f64>,
}

impl RequestMetrics {
    /// Records one completed request and flushes a snapshot when a
    /// threshold is crossed.
    pub fn record(&self, status: StatusCode, body: &[u8]) {
        let total = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;

        if status == StatusCode::OK {
            let digest: [u8; 32] = Sha256::digest(body).into();
            if let Ok(mut unique) = self.unique_responses.lock() {
                unique.insert(digest);
            }
        } else {
            self.invalid_responses.fetch_add(1, Ordering::Relaxed);
        }

        if FLUSH_THRESHOLDS.contains(&total) {
            let snapshot = self.snapshot();
            tracing::info!(
                total_requests = snapshot.total_requests,
                invalid_responses = snapshot.invalid_responses,
                unique_responses = snapshot.unique_responses,
                unique_rate = ?snapshot.unique_rate,
                "Request metrics threshold reached"
            );
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let invalid_responses = self.invalid_responses.load(Ordering::Relaxed);
        let unique_responses = self
            .unique_responses
            .lock()
            .map(|unique| unique.len())
            .unwrap_or(0);

        let successful = total_requests.saturating_sub(invalid_responses);
        let unique_rate = if successful == 0 {
            None
        } else {
            Some(unique_responses as f64 / successful as f64)
        };

        MetricsSnapshot {
            total_requests,
            invalid_responses,
            unique_responses,
            unique_rate,
        }
    }
}

/// Route layer recording status and body of every recommend response.
///
/// Buffers the response body to hash it; recommendation bodies are a
/// comma-joined list of 20 identifiers, small by construction.
pub async fn track_responses(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let (parts, body) = response.into_parts();

    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            state.metrics.record(parts.status, &bytes);
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(error) => {
            tracing::error!(%error, "Failed to buffer response body for metrics");
            Response::from_parts(parts, Body::empty())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_totals_and_invalids() {
        let metrics = RequestMetrics::default();

        metrics.record(StatusCode::OK, b"movie1,movie2");
        metrics.record(StatusCode::BAD_REQUEST, b"");
        metrics.record(StatusCode::OK, b"movie1,movie2");
        metrics.record(StatusCode::OK, b"movie3,movie4");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.invalid_responses, 1);
        // Two distinct bodies across three successful responses.
        assert_eq!(snapshot.unique_responses, 2);
        assert_eq!(snapshot.unique_rate, Some(2.0 / 3.0));
    }

    #[test]
    fn test_unique_rate_undefined_without_successes() {
        let metrics = RequestMetrics::default();
        metrics.record(StatusCode::BAD_REQUEST, b"");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.unique_rate, None);
    }
}
