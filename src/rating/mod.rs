//! Rating system integration using the Elo algorithm
//!
//! This module provides the pure rating update applied on every vote and the
//! calculator trait the stores call inside their atomic update.

pub mod calculator;
pub mod elo;

// Re-export commonly used types
pub use calculator::{MockRatingCalculator, RatingCalculator, RatingUpdate};
pub use elo::{compute_update, EloRatingCalculator};
