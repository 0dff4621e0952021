//! Service layer for the ranking engine
//!
//! Application wiring, request orchestration and health checks.

pub mod app;
pub mod health;
pub mod rankings;

pub use app::{AppState, ServiceError};
pub use health::HealthCheck;
pub use rankings::RankingService;
