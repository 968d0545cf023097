pub mod request_id;
pub mod request_metrics;

pub use request_id::{make_span_with_request_id, request_id_middleware};
pub use request_metrics::{track_responses, MetricsSnapshot, RequestMetrics};
