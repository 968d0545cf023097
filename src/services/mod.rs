pub mod ingest;
pub mod model;
pub mod performance;

pub use ingest::{ingest_lines, IngestReport};
pub use model::{Recommender, SvdRecommender};
pub use performance::{calculate_metric_for_day, war_over_period, DailyMetric, PeriodReport};
