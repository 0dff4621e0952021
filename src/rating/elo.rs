//! Elo rating system implementation
//!
//! Integer ratings, a fixed K factor and truncation toward zero. The expected
//! score comes from the skillratings crate; the update itself is done here so
//! the truncation rule is explicit.

use skillratings::elo::{expected_score as elo_expected_score, EloRating};

use crate::config::RatingConfig;
use crate::rating::calculator::{RatingCalculator, RatingUpdate};

pub const DEFAULT_K_FACTOR: f64 = 32.0;
pub const DEFAULT_INITIAL_RATING: i32 = 1500;

/// Compute a vote's rating update with the default K factor
pub fn compute_update(winner_rating: i32, loser_rating: i32) -> RatingUpdate {
    EloRatingCalculator::default().compute_update(winner_rating, loser_rating)
}

/// Elo rating calculator
#[derive(Debug, Clone)]
pub struct EloRatingCalculator {
    k_factor: f64,
    initial_rating: i32,
}

impl EloRatingCalculator {
    /// Create a calculator from validated rating configuration
    pub fn new(config: &RatingConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            k_factor: config.k_factor,
            initial_rating: config.initial_rating,
        })
    }

    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }
}

impl Default for EloRatingCalculator {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            initial_rating: DEFAULT_INITIAL_RATING,
        }
    }
}

impl RatingCalculator for EloRatingCalculator {
    fn compute_update(&self, winner_rating: i32, loser_rating: i32) -> RatingUpdate {
        let expected_winner = self.expected_score(winner_rating, loser_rating);
        let expected_loser = 1.0 - expected_winner;

        // `as` truncates toward zero and saturates at the i32 bounds
        let new_winner = (winner_rating as f64 + self.k_factor * (1.0 - expected_winner)) as i32;
        let new_loser = (loser_rating as f64 + self.k_factor * (0.0 - expected_loser)) as i32;

        RatingUpdate::from_ratings(winner_rating, loser_rating, new_winner, new_loser)
    }

    fn expected_score(&self, rating: i32, opponent: i32) -> f64 {
        let (expected, _) = elo_expected_score(
            &EloRating {
                rating: rating as f64,
            },
            &EloRating {
                rating: opponent as f64,
            },
        );
        expected
    }

    fn initial_rating(&self) -> i32 {
        self.initial_rating
    }
}
