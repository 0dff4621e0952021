//! Metrics and monitoring for the ranking service
//!
//! Prometheus metrics served at `/metrics` by the API router.

pub mod collector;

pub use collector::{HttpMetrics, MetricsCollector, MetricsTimer, RankingMetrics, StoreMetrics};
