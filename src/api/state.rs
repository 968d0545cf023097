use std::sync::Arc;

use crate::db::{EventStore, PredictionCache};
use crate::middleware::RequestMetrics;
use crate::services::Recommender;

/// Shared application state
///
/// All collaborators are `Arc`-wrapped and immutable after startup; the
/// request-metrics counters are interior-mutable and reset with the process.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub recommender: Arc<dyn Recommender>,
    pub cache: Arc<PredictionCache>,
    pub metrics: Arc<RequestMetrics>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        recommender: Arc<dyn Recommender>,
        cache: Arc<PredictionCache>,
    ) -> Self {
        Self {
            store,
            recommender,
            cache,
            metrics: Arc::new(RequestMetrics::default()),
        }
    }
}
