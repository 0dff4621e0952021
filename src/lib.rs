//! Clout Rank - pairwise voting and ranking service for companies
//!
//! This crate provides Elo-based ranking from head-to-head votes, random
//! matchups, paginated leaderboards and per-company feedback, served over
//! HTTP in either JSON or a compact binary encoding.

pub mod api;
pub mod auth;
pub mod codec;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod matchup;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types and traits
pub use error::{RankingError, Result};
pub use types::*;

// Re-export key components
pub use rating::{EloRatingCalculator, RatingCalculator};
pub use service::{AppState, RankingService};
pub use store::{EntityStore, InMemoryEntityStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
