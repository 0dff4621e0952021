//! Matchup selection
//!
//! Chooses which two companies a voter is asked to compare.

pub mod selector;

pub use selector::MatchupSelector;
