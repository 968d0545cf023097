use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::db::store::EventStore;
use crate::error::AppResult;

/// Score contributed by a recommendation whose user watched nothing
/// afterwards, or watched something off the recommended list.
const UNCONSUMED_PENALTY: f64 = 1.0;

/// Earliest watch event after a reference instant.
#[derive(Debug, Clone, PartialEq)]
pub struct NextWatch {
    pub movie_id: String,
    pub watched_at: DateTime<Utc>,
}

/// Earliest rating of a given movie after a reference instant.
#[derive(Debug, Clone, PartialEq)]
pub struct NextRating {
    pub rating: i32,
    pub rated_at: DateTime<Utc>,
}

/// One day's recommendation quality.
///
/// `score` is `None` when the day produced no scores at all: no
/// recommendations were issued, or every one was watched-from-the-list but
/// never rated (excluded, not penalized).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub score: Option<f64>,
    pub recommendations: usize,
}

/// Per-day metrics plus range statistics for an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub days: Vec<DailyMetric>,
    /// `None` for an empty range.
    pub summary: Option<PeriodSummary>,
}

/// Range statistics. Undefined days enter these as 0.0; the per-day rows
/// keep `null` so the two cases stay distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Finds the first movie the user watched strictly after `after`.
///
/// The earliest post-cutoff checkpoint identifies what the user watched
/// next, independent of how long they watched it, because a playing movie
/// keeps emitting checkpoints and a switch emits one for the new movie.
pub async fn find_next_watch(
    store: &dyn EventStore,
    user_id: &str,
    after: DateTime<Utc>,
) -> AppResult<Option<NextWatch>> {
    let event = store.first_watch_after(user_id, after).await?;

    Ok(event.map(|event| NextWatch {
        movie_id: event.movie_id,
        watched_at: event.timestamp,
    }))
}

/// Finds the user's first rating of `movie_id` strictly after `after`.
/// `None` means the movie was never rated after the cutoff.
pub async fn find_next_rating(
    store: &dyn EventStore,
    user_id: &str,
    after: DateTime<Utc>,
    movie_id: &str,
) -> AppResult<Option<NextRating>> {
    let event = store.first_rating_after(user_id, movie_id, after).await?;

    Ok(event.map(|event| NextRating {
        rating: event.rating,
        rated_at: event.timestamp,
    }))
}

/// Scores every recommendation issued on `date` (UTC calendar day) and
/// reduces to the mean outcome.
///
/// Per recommendation: the user's next watch, when it is on the recommended
/// list, contributes that movie's next rating if one exists and nothing
/// otherwise; no watch at all, or a watch off the list, contributes the
/// penalty score 1. Equal weight per recommendation event, not per user.
pub async fn calculate_metric_for_day(
    store: &dyn EventStore,
    date: NaiveDate,
) -> AppResult<DailyMetric> {
    let start_of_day = date.and_time(NaiveTime::MIN).and_utc();
    let end_of_day = start_of_day + Duration::days(1);

    let recommendations = store
        .recommendations_between(start_of_day, end_of_day)
        .await?;

    let mut outcomes: Vec<f64> = Vec::new();

    for recommendation in &recommendations {
        let next_watch =
            find_next_watch(store, &recommendation.user_id, recommendation.timestamp).await?;

        match next_watch {
            Some(watch) if recommendation.recommended_movies.contains(&watch.movie_id) => {
                let next_rating = find_next_rating(
                    store,
                    &recommendation.user_id,
                    recommendation.timestamp,
                    &watch.movie_id,
                )
                .await?;

                // Watched but never rated: excluded from the average.
                if let Some(rated) = next_rating {
                    outcomes.push(f64::from(rated.rating));
                }
            }
            _ => outcomes.push(UNCONSUMED_PENALTY),
        }
    }

    let score = if outcomes.is_empty() {
        None
    } else {
        Some(outcomes.iter().sum::<f64>() / outcomes.len() as f64)
    };

    Ok(DailyMetric {
        date,
        score,
        recommendations: recommendations.len(),
    })
}

/// Computes the daily metric for each day in the inclusive range, ascending,
/// and reduces to min/max/mean.
///
/// Undefined days substitute 0.0 into the range statistics; the per-day rows
/// keep `None`. An empty (inverted) range reports no days and no summary.
pub async fn war_over_period(
    store: &dyn EventStore,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<PeriodReport> {
    let mut days = Vec::new();

    let mut current = start;
    while current <= end {
        let metric = calculate_metric_for_day(store, current).await?;
        tracing::info!(
            date = %metric.date,
            score = ?metric.score,
            recommendations = metric.recommendations,
            "Daily recommendation quality"
        );
        days.push(metric);

        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    let summary = if days.is_empty() {
        None
    } else {
        let values: Vec<f64> = days
            .iter()
            .map(|day| day.score.unwrap_or(0.0))
            .collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        Some(PeriodSummary { min, max, mean })
    };

    Ok(PeriodReport { days, summary })
}
