use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::RECOMMENDATION_LIST_LEN;

/// The recommendation-model collaborator: given a user id, an ordered list
/// of movie identifiers with spaces replaced by `+`.
pub trait Recommender: Send + Sync {
    fn predict_top_movies(&self, user_id: i64) -> AppResult<Vec<String>>;
}

/// Latent factors for one user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserFactors {
    pub bias: f64,
    pub factors: Vec<f64>,
}

/// Latent factors for one catalog movie.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieFactors {
    pub title: String,
    pub bias: f64,
    pub factors: Vec<f64>,
}

/// Trained matrix-factorization artifact, exported to JSON by the training
/// pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub global_mean: f64,
    pub users: HashMap<i64, UserFactors>,
    pub movies: Vec<MovieFactors>,
}

/// SVD-style recommender over a precomputed artifact.
///
/// Known users get the catalog ranked by predicted rating. A user id absent
/// from the trained set falls back to 20 movies sampled uniformly from the
/// catalog rather than failing.
pub struct SvdRecommender {
    artifact: ModelArtifact,
}

impl SvdRecommender {
    /// Loads the artifact from disk. A missing or corrupt artifact is a
    /// startup failure; the serving process is useless without it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading model artifact {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("parsing model artifact {}", path.display()))?;

        if artifact.movies.is_empty() {
            anyhow::bail!("model artifact {} has an empty movie catalog", path.display());
        }

        tracing::info!(
            users = artifact.users.len(),
            movies = artifact.movies.len(),
            "Recommendation model loaded"
        );

        Ok(Self { artifact })
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    fn predicted_rating(&self, user: &UserFactors, movie: &MovieFactors) -> f64 {
        let interaction: f64 = user
            .factors
            .iter()
            .zip(&movie.factors)
            .map(|(u, m)| u * m)
            .sum();

        self.artifact.global_mean + user.bias + movie.bias + interaction
    }
}

impl Recommender for SvdRecommender {
    fn predict_top_movies(&self, user_id: i64) -> AppResult<Vec<String>> {
        if self.artifact.movies.is_empty() {
            return Err(AppError::Model("empty movie catalog".to_string()));
        }

        let titles: Vec<&str> = match self.artifact.users.get(&user_id) {
            Some(user) => {
                let mut predictions: Vec<(&str, f64)> = self
                    .artifact
                    .movies
                    .iter()
                    .map(|movie| (movie.title.as_str(), self.predicted_rating(user, movie)))
                    .collect();

                predictions.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal)
                });

                predictions
                    .into_iter()
                    .take(RECOMMENDATION_LIST_LEN)
                    .map(|(title, _)| title)
                    .collect()
            }
            None => {
                // Unknown user: not personalized, uniform catalog sample.
                tracing::debug!(user_id, "Unknown user, sampling catalog");
                self.artifact
                    .movies
                    .choose_multiple(&mut rand::thread_rng(), RECOMMENDATION_LIST_LEN)
                    .map(|movie| movie.title.as_str())
                    .collect()
            }
        };

        Ok(titles.into_iter().map(format_identifier).collect())
    }
}

/// Wire format for movie identifiers: spaces become `+`.
fn format_identifier(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ModelArtifact {
        // Three users, twenty-five movies. User 1 strongly prefers
        // even-indexed movies; user 2 the odd-indexed ones.
        let movies = (0..25)
            .map(|i| MovieFactors {
                title: format!("movie number {i}"),
                bias: 0.0,
                factors: vec![if i % 2 == 0 { 1.0 } else { -1.0 }, i as f64 * 0.01],
            })
            .collect();

        let mut users = HashMap::new();
        users.insert(
            1,
            UserFactors { bias: 0.5, factors: vec![1.0, 1.0] },
        );
        users.insert(
            2,
            UserFactors { bias: 0.0, factors: vec![-1.0, 1.0] },
        );

        ModelArtifact { global_mean: 3.5, users, movies }
    }

    #[test]
    fn test_known_user_gets_top_twenty_by_predicted_rating() {
        let recommender = SvdRecommender::from_artifact(artifact());

        let movies = recommender.predict_top_movies(1).unwrap();

        assert_eq!(movies.len(), 20);
        // Highest-scoring movie for user 1: even index with the largest
        // second factor, movie 24.
        assert_eq!(movies[0], "movie+number+24");
    }

    #[test]
    fn test_rankings_differ_per_user() {
        let recommender = SvdRecommender::from_artifact(artifact());

        let first = recommender.predict_top_movies(1).unwrap();
        let second = recommender.predict_top_movies(2).unwrap();

        assert_eq!(second[0], "movie+number+23");
        assert_ne!(first, second);
    }

    #[test]
    fn test_unknown_user_falls_back_to_catalog_sample() {
        let recommender = SvdRecommender::from_artifact(artifact());

        let movies = recommender.predict_top_movies(999_999).unwrap();

        assert_eq!(movies.len(), 20);
        // No duplicates, every pick from the catalog, wire-formatted.
        let unique: std::collections::HashSet<&String> = movies.iter().collect();
        assert_eq!(unique.len(), 20);
        for movie in &movies {
            assert!(movie.starts_with("movie+number+"));
        }
    }

    #[test]
    fn test_identifier_formatting_replaces_spaces() {
        assert_eq!(format_identifier("the dark knight 2008"), "the+dark+knight+2008");
        assert_eq!(format_identifier("solo"), "solo");
    }
}
