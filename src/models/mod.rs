use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number of movie identifiers carried by every recommendation-serving line.
pub const RECOMMENDATION_LIST_LEN: usize = 20;

/// One playback-progress checkpoint.
///
/// A user watching continuously emits one of these per minute mark of the
/// current movie, then a fresh one (minute 0) when playback switches to the
/// next movie. The earliest event after an instant therefore identifies what
/// the user watched next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WatchEvent {
    pub user_id: String,
    pub movie_id: String,
    pub timestamp: DateTime<Utc>,
    /// Minute mark of playback reached at event time.
    pub minute: i32,
}

/// One rating action. A user may rate the same movie repeatedly; each action
/// is a separate event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RatingEvent {
    pub user_id: String,
    pub movie_id: String,
    pub timestamp: DateTime<Utc>,
    /// Modeled range 1-5. Upstream is trusted; not validated at parse time.
    pub rating: i32,
}

/// One recommendation delivery.
///
/// `recommended_movies` keeps the served rank order; scoring only checks set
/// membership, but the order is preserved end to end so a rank-weighted
/// scorer would not need a schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecommendationEvent {
    pub user_id: String,
    pub recommended_movies: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A normalized log line, ready for the store-write dispatch.
///
/// Closed set of event categories; every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    Watch(WatchEvent),
    Rate(RatingEvent),
    Recommendation(RecommendationEvent),
}

impl EventRecord {
    /// User the event belongs to, regardless of category.
    pub fn user_id(&self) -> &str {
        match self {
            EventRecord::Watch(event) => &event.user_id,
            EventRecord::Rate(event) => &event.user_id,
            EventRecord::Recommendation(event) => &event.user_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EventRecord::Watch(event) => event.timestamp,
            EventRecord::Rate(event) => event.timestamp,
            EventRecord::Recommendation(event) => event.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_record_accessors() {
        let watch = EventRecord::Watch(WatchEvent {
            user_id: "user123".to_string(),
            movie_id: "movie1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 13, 23, 19).unwrap(),
            minute: 5,
        });

        assert_eq!(watch.user_id(), "user123");
        assert_eq!(
            watch.timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 15, 13, 23, 19).unwrap()
        );
    }

    #[test]
    fn test_rating_event_serde_round_trip() {
        let event = RatingEvent {
            user_id: "user456".to_string(),
            movie_id: "5678".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 13, 23, 19).unwrap(),
            rating: 4,
        };

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: RatingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
