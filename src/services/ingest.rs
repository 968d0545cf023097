use serde::Serialize;

use crate::db::store::EventStore;
use crate::error::AppResult;
use crate::models::EventRecord;
use crate::telemetry;

/// Outcome of one ingestion batch.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Lines normalized and persisted.
    pub ingested: usize,
    /// Lines dropped as invalid or malformed.
    pub dropped: usize,
}

/// Classifies, normalizes and persists a newline-delimited batch of raw log
/// lines.
///
/// A line that fails classification or normalization is logged and dropped
/// without affecting the rest of the batch. A store failure aborts the whole
/// call; lines already written stay written.
pub async fn ingest_lines(store: &dyn EventStore, payload: &str) -> AppResult<IngestReport> {
    let mut report = IngestReport::default();

    for line in payload.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match telemetry::normalize_line(line) {
            Ok(record) => {
                write_record(store, &record).await?;
                report.ingested += 1;
            }
            Err(error) => {
                tracing::warn!(%error, line, "Dropping log line");
                report.dropped += 1;
            }
        }
    }

    tracing::debug!(
        ingested = report.ingested,
        dropped = report.dropped,
        "Telemetry batch processed"
    );

    Ok(report)
}

/// Dispatches a normalized record to the matching store collection.
async fn write_record(store: &dyn EventStore, record: &EventRecord) -> AppResult<()> {
    match record {
        EventRecord::Watch(event) => store.insert_watch(event).await,
        EventRecord::Rate(event) => store.insert_rating(event).await,
        EventRecord::Recommendation(event) => store.insert_recommendation(event).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EventStore as _, MemoryEventStore, MockEventStore};
    use crate::error::AppError;
    use chrono::{TimeZone, Utc};

    fn recommendation_line(user_id: &str) -> String {
        let movies = (1..=20).map(|i| format!("movie{i}")).collect::<Vec<_>>().join(",");
        format!("2024-03-15T12:00:00.500000,{user_id},recommendation request fireflyserver,status 200,{movies}")
    }

    #[tokio::test]
    async fn test_ingest_routes_each_category_to_its_collection() {
        let store = MemoryEventStore::new();
        let payload = format!(
            "2024-03-15T13:23:19,user123,/data/movie/1234/5.mpg\n\
             2024-03-15T13:25:00,user123,/rate/movie/1234=4\n\
             {}\n",
            recommendation_line("user123")
        );

        let report = ingest_lines(&store, &payload).await.unwrap();

        assert_eq!(report, IngestReport { ingested: 3, dropped: 0 });

        let after = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let watch = store.first_watch_after("user123", after).await.unwrap().unwrap();
        assert_eq!(watch.movie_id, "1234");
        assert_eq!(watch.minute, 5);

        let rating = store
            .first_rating_after("user123", "1234", after)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rating.rating, 4);

        let recommendations = store
            .recommendations_between(after, after + chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].recommended_movies.len(), 20);
    }

    #[tokio::test]
    async fn test_bad_lines_do_not_abort_the_batch() {
        let store = MemoryEventStore::new();
        let payload = "not a log line\n\
                       2024-03-15T13:23:19,user123,/data/movie/1234/five.mpg\n\
                       2024-03-15T13:25:00,user123,/rate/movie/1234=4\n\
                       \n\
                       2024-03-15T13:26:00,user456,/data/movie/777/1.mpg\n";

        let report = ingest_lines(&store, payload).await.unwrap();

        // The malformed minute and the unclassifiable line drop; the two
        // well-formed lines after them still land.
        assert_eq!(report, IngestReport { ingested: 2, dropped: 2 });
    }

    #[tokio::test]
    async fn test_store_failure_aborts_the_batch() {
        let mut store = MockEventStore::new();
        store
            .expect_insert_watch()
            .returning(|_| Err(AppError::Store(sqlx::Error::PoolClosed)));

        let payload = "2024-03-15T13:23:19,user123,/data/movie/1234/5.mpg\n";
        let result = ingest_lines(&store, payload).await;

        assert!(matches!(result, Err(AppError::Store(_))));
    }
}
