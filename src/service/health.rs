//! Health checks for the ranking service
//!
//! The service is healthy when the entity store answers a ping within the
//! store timeout. An unreachable store makes it degraded, which is reported
//! as a normal payload rather than an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::metrics::MetricsCollector;
use crate::store::EntityStore;
use crate::types::{HealthReport, HealthStatus};

pub const DATABASE_CONNECTED: &str = "connected";
pub const DATABASE_DISCONNECTED: &str = "disconnected";

/// Store connectivity probe
pub struct HealthCheck {
    store: Arc<dyn EntityStore>,
    metrics: Arc<MetricsCollector>,
    service_name: String,
    timeout: Duration,
}

impl HealthCheck {
    pub fn new(
        store: Arc<dyn EntityStore>,
        metrics: Arc<MetricsCollector>,
        service_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            service_name: service_name.into(),
            timeout,
        }
    }

    /// Ping the store and build the health payload
    pub async fn check(&self) -> HealthReport {
        let start = Instant::now();

        let status = match tokio::time::timeout(self.timeout, self.store.ping()).await {
            Ok(Ok(())) => HealthStatus::Healthy,
            Ok(Err(e)) => {
                warn!("Store ping failed: {}", e);
                HealthStatus::Degraded
            }
            Err(_) => {
                warn!("Store ping timed out after {:?}", self.timeout);
                self.metrics.record_store_timeout("ping");
                HealthStatus::Degraded
            }
        };
        self.metrics.update_health_status(status);

        debug!(
            "Health check finished in {:.2}ms: {}",
            start.elapsed().as_secs_f64() * 1000.0,
            status.as_str()
        );

        HealthReport {
            status,
            database: match status {
                HealthStatus::Healthy => DATABASE_CONNECTED,
                HealthStatus::Degraded | HealthStatus::Unhealthy => DATABASE_DISCONNECTED,
            }
            .to_string(),
            service: self.service_name.clone(),
            version: crate::VERSION.to_string(),
        }
    }
}
