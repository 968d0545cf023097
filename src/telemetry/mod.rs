use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::models::{
    EventRecord, RatingEvent, RecommendationEvent, WatchEvent, RECOMMENDATION_LIST_LEN,
};

/// Path marker identifying a playback-progress line.
const WATCH_MARKER: &str = "/data/";
/// Path marker identifying a rating line.
const RATE_MARKER: &str = "/rate/";
/// Marker identifying a recommendation-serving line.
const RECOMMEND_MARKER: &str = "recommendation";

/// Field layout of a recommendation-serving line: timestamp, user id, two
/// metadata fields (server, status), then the 20 recommended movies.
const RECOMMENDATION_MOVIES_START: usize = 4;
const RECOMMENDATION_MIN_FIELDS: usize = RECOMMENDATION_MOVIES_START + RECOMMENDATION_LIST_LEN;

/// Errors local to a single log line. One bad line never aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed path segment: {0}")]
    MalformedPath(String),

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("recommendation record truncated: expected {expected} fields, got {got}")]
    TruncatedRecord { expected: usize, got: usize },

    #[error("line matches no known event category")]
    UnrecognizedLine,
}

/// Category of a raw log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Watch,
    Rate,
    Recommendation,
    Invalid,
}

/// Classifies a comma-split log line.
///
/// Precedence: a 3-field line whose third field carries the watch marker is
/// a watch even if it also carries the rate marker; rate is checked second;
/// the recommendation marker wins for any field count of at least 3.
pub fn classify(fields: &[&str]) -> LineKind {
    match fields {
        [_, _, path] if path.contains(WATCH_MARKER) => LineKind::Watch,
        [_, _, path] if path.contains(RATE_MARKER) => LineKind::Rate,
        [_, _, third, ..] if third.contains(RECOMMEND_MARKER) => LineKind::Recommendation,
        _ => LineKind::Invalid,
    }
}

/// Splits a raw line on the stream delimiter and normalizes it into a typed
/// event record.
pub fn normalize_line(line: &str) -> Result<EventRecord, ParseError> {
    let fields: Vec<&str> = line.split(',').collect();

    match classify(&fields) {
        LineKind::Watch => parse_watch(&fields).map(EventRecord::Watch),
        LineKind::Rate => parse_rate(&fields).map(EventRecord::Rate),
        LineKind::Recommendation => parse_recommendation(&fields).map(EventRecord::Recommendation),
        LineKind::Invalid => Err(ParseError::UnrecognizedLine),
    }
}

/// Normalizes a watch line: `<timestamp>,<user_id>,/data/movie/<movie_id>/<minute>.<ext>`.
///
/// The last two path segments are the movie id and the minute checkpoint;
/// the minute is the integer prefix of the final segment before its
/// extension dot.
fn parse_watch(fields: &[&str]) -> Result<WatchEvent, ParseError> {
    let [timestamp_str, user_id, path] = fields else {
        return Err(ParseError::UnrecognizedLine);
    };

    let mut tail = path.rsplit('/');
    let minute_segment = tail
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ParseError::MalformedPath(path.to_string()))?;
    let movie_id = tail
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ParseError::MalformedPath(path.to_string()))?;

    let minute_prefix = minute_segment
        .split_once('.')
        .map_or(minute_segment, |(prefix, _)| prefix);
    let minute: i32 = minute_prefix
        .parse()
        .map_err(|_| ParseError::MalformedPath(path.to_string()))?;

    Ok(WatchEvent {
        user_id: (*user_id).to_string(),
        movie_id: movie_id.to_string(),
        timestamp: parse_instant_seconds(timestamp_str)?,
        minute,
    })
}

/// Normalizes a rating line: `<timestamp>,<user_id>,/rate/movie/<movie_id>=<rating>`.
///
/// The final path segment splits once on `=`; the right side must parse as
/// an integer. No range check: 1-5 is a modeled invariant, upstream is
/// trusted.
fn parse_rate(fields: &[&str]) -> Result<RatingEvent, ParseError> {
    let [timestamp_str, user_id, path] = fields else {
        return Err(ParseError::UnrecognizedLine);
    };

    let last_segment = path.rsplit('/').next().unwrap_or(path);
    let (movie_id, rating_str) = last_segment
        .split_once('=')
        .ok_or_else(|| ParseError::MalformedPath(path.to_string()))?;
    let rating: i32 = rating_str
        .parse()
        .map_err(|_| ParseError::MalformedPath(path.to_string()))?;

    Ok(RatingEvent {
        user_id: (*user_id).to_string(),
        movie_id: movie_id.to_string(),
        timestamp: parse_instant_seconds(timestamp_str)?,
        rating,
    })
}

/// Normalizes a recommendation-serving line.
///
/// Field 0 is the timestamp, field 1 the user id; fields 2-3 are server and
/// status metadata and are ignored. The fixed window of 20 movie ids follows,
/// whatever trails after it (response-time metadata) is ignored too.
fn parse_recommendation(fields: &[&str]) -> Result<RecommendationEvent, ParseError> {
    if fields.len() < RECOMMENDATION_MIN_FIELDS {
        return Err(ParseError::TruncatedRecord {
            expected: RECOMMENDATION_MIN_FIELDS,
            got: fields.len(),
        });
    }

    let recommended_movies = fields[RECOMMENDATION_MOVIES_START..RECOMMENDATION_MIN_FIELDS]
        .iter()
        .map(|movie| movie.trim().to_string())
        .collect();

    Ok(RecommendationEvent {
        user_id: fields[1].to_string(),
        recommended_movies,
        timestamp: parse_instant_full(fields[0])?,
    })
}

/// Parses a watch/rate timestamp at second precision, assumed UTC.
///
/// The stream carries no timezone for these categories. A fractional part,
/// when present, is accepted and truncated to whole seconds.
fn parse_instant_seconds(value: &str) -> Result<DateTime<Utc>, ParseError> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| ParseError::MalformedTimestamp(value.to_string()))?;
    let truncated = naive.with_nanosecond(0).unwrap_or(naive);
    Ok(truncated.and_utc())
}

/// Parses a recommendation-line timestamp at full precision.
///
/// An explicit offset is honored and converted to UTC; an offset-less
/// timestamp is assumed UTC. Fractional seconds are retained.
fn parse_instant_full(value: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::MalformedTimestamp(value.to_string()))
}
