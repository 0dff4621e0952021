//! Rating calculator trait and implementations
//!
//! This module defines the interface the vote pipeline uses to turn a
//! pairwise result into new ratings, plus a recording mock for tests.

use std::sync::Mutex;

/// New ratings produced by a single pairwise result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingUpdate {
    pub new_winner_rating: i32,
    pub new_loser_rating: i32,
    pub winner_delta: i32,
    pub loser_delta: i32,
}

impl RatingUpdate {
    /// Build an update from the before/after ratings of both sides
    pub fn from_ratings(
        old_winner: i32,
        old_loser: i32,
        new_winner_rating: i32,
        new_loser_rating: i32,
    ) -> Self {
        Self {
            new_winner_rating,
            new_loser_rating,
            winner_delta: new_winner_rating - old_winner,
            loser_delta: new_loser_rating - old_loser,
        }
    }
}

/// Trait for calculating rating changes after a vote
///
/// Implementations must be pure: the same inputs always give the same update.
/// Stores call this while holding their write serialization, so it must not
/// block.
pub trait RatingCalculator: Send + Sync {
    /// Compute new ratings for a winner/loser pair
    fn compute_update(&self, winner_rating: i32, loser_rating: i32) -> RatingUpdate;

    /// Probability that a company rated `rating` beats one rated `opponent`
    fn expected_score(&self, rating: i32, opponent: i32) -> f64;

    /// Rating assigned to newly created companies
    fn initial_rating(&self) -> i32;
}

/// Mock rating calculator for testing
///
/// Applies a fixed delta to both sides and records every call, so tests can
/// check which ratings the store handed to the calculator.
#[derive(Debug)]
pub struct MockRatingCalculator {
    delta: i32,
    calls: Mutex<Vec<(i32, i32)>>,
}

impl MockRatingCalculator {
    pub fn new(delta: i32) -> Self {
        Self {
            delta,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Get all (winner, loser) rating pairs seen so far
    pub fn calls(&self) -> Vec<(i32, i32)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }
}

impl Default for MockRatingCalculator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn compute_update(&self, winner_rating: i32, loser_rating: i32) -> RatingUpdate {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((winner_rating, loser_rating));
        }
        RatingUpdate::from_ratings(
            winner_rating,
            loser_rating,
            winner_rating.saturating_add(self.delta),
            loser_rating.saturating_sub(self.delta),
        )
    }

    fn expected_score(&self, _rating: i32, _opponent: i32) -> f64 {
        0.5
    }

    fn initial_rating(&self) -> i32 {
        1500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_update_deltas() {
        let update = RatingUpdate::from_ratings(1500, 1400, 1512, 1388);
        assert_eq!(update.winner_delta, 12);
        assert_eq!(update.loser_delta, -12);
    }

    #[test]
    fn test_mock_calculator_records_calls() {
        let calculator = MockRatingCalculator::new(5);

        let update = calculator.compute_update(1500, 1600);
        assert_eq!(update.new_winner_rating, 1505);
        assert_eq!(update.new_loser_rating, 1595);

        calculator.compute_update(1505, 1595);
        assert_eq!(calculator.calls(), vec![(1500, 1600), (1505, 1595)]);

        calculator.clear_calls();
        assert!(calculator.calls().is_empty());
    }
}
