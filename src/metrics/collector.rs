//! Metrics collection using Prometheus
//!
//! Metrics are grouped by concern: HTTP traffic, ranking activity and store
//! health. Every group registers against the collector's registry, which is
//! what `/metrics` exposes.

use crate::rating::RatingUpdate;
use crate::types::HealthStatus;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ranking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    http_metrics: HttpMetrics,
    ranking_metrics: RankingMetrics,
    store_metrics: StoreMetrics,
}

/// Per-route HTTP metrics
#[derive(Clone)]
pub struct HttpMetrics {
    /// Requests by method, matched route and status code
    pub requests_total: IntCounterVec,

    /// Request latency by method and matched route
    pub request_duration_seconds: HistogramVec,

    /// Requests cut off by the request timeout
    pub timeouts_total: IntCounter,
}

/// Voting and feedback metrics
#[derive(Clone)]
pub struct RankingMetrics {
    /// Votes whose rating update committed
    pub votes_total: IntCounter,

    /// Votes rejected before any write, by reason
    pub vote_rejections_total: IntCounterVec,

    /// Absolute rating change applied to each side of a vote
    pub rating_delta: Histogram,

    /// Matchups handed out
    pub matchups_served_total: IntCounter,

    /// Vote audit rows that failed to persist after ratings committed
    pub audit_failures_total: IntCounter,

    /// Criterion ratings, comments and upvotes accepted
    pub feedback_total: IntCounterVec,
}

/// Entity store metrics
#[derive(Clone)]
pub struct StoreMetrics {
    /// Health status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Store calls that exceeded the operation timeout
    pub operation_timeouts_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let http_metrics = HttpMetrics::new(&registry)?;
        let ranking_metrics = RankingMetrics::new(&registry)?;
        let store_metrics = StoreMetrics::new(&registry)?;

        Ok(Self {
            registry,
            http_metrics,
            ranking_metrics,
            store_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn http(&self) -> &HttpMetrics {
        &self.http_metrics
    }

    pub fn ranking(&self) -> &RankingMetrics {
        &self.ranking_metrics
    }

    pub fn store(&self) -> &StoreMetrics {
        &self.store_metrics
    }

    /// Record a finished HTTP request
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.http_metrics
            .requests_total
            .with_label_values(&[method, route, status.as_str()])
            .inc();
        self.http_metrics
            .request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration.as_secs_f64());
    }

    pub fn record_request_timeout(&self) {
        self.http_metrics.timeouts_total.inc();
    }

    /// Record a committed vote and the deltas it applied
    pub fn record_vote(&self, update: &RatingUpdate) {
        self.ranking_metrics.votes_total.inc();
        self.ranking_metrics
            .rating_delta
            .observe(f64::from(update.winner_delta.unsigned_abs()));
        self.ranking_metrics
            .rating_delta
            .observe(f64::from(update.loser_delta.unsigned_abs()));
    }

    pub fn record_vote_rejected(&self, reason: &str) {
        self.ranking_metrics
            .vote_rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_matchup_served(&self) {
        self.ranking_metrics.matchups_served_total.inc();
    }

    pub fn record_audit_failure(&self) {
        self.ranking_metrics.audit_failures_total.inc();
    }

    /// `kind` is one of `rating`, `comment` or `upvote`
    pub fn record_feedback(&self, kind: &str) {
        self.ranking_metrics
            .feedback_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_store_timeout(&self, operation: &str) {
        self.store_metrics
            .operation_timeouts_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: HealthStatus) {
        let value = match status {
            HealthStatus::Unhealthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Healthy => 2,
        };
        self.store_metrics.health_status.set(value);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl HttpMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("clout_rank_http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "clout_rank_http_request_duration_seconds",
                "HTTP request latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["method", "route"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let timeouts_total = IntCounter::new(
            "clout_rank_http_timeouts_total",
            "Requests aborted by the request timeout",
        )?;
        registry.register(Box::new(timeouts_total.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            timeouts_total,
        })
    }
}

impl RankingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let votes_total = IntCounter::new("clout_rank_votes_total", "Total votes applied")?;
        registry.register(Box::new(votes_total.clone()))?;

        let vote_rejections_total = IntCounterVec::new(
            Opts::new(
                "clout_rank_vote_rejections_total",
                "Votes rejected before any write",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(vote_rejections_total.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new(
                "clout_rank_rating_delta",
                "Absolute rating change per side of a vote",
            )
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        let matchups_served_total = IntCounter::new(
            "clout_rank_matchups_served_total",
            "Total matchups served",
        )?;
        registry.register(Box::new(matchups_served_total.clone()))?;

        let audit_failures_total = IntCounter::new(
            "clout_rank_vote_audit_failures_total",
            "Vote audit inserts that failed after ratings committed",
        )?;
        registry.register(Box::new(audit_failures_total.clone()))?;

        let feedback_total = IntCounterVec::new(
            Opts::new("clout_rank_feedback_total", "Feedback submissions accepted"),
            &["kind"],
        )?;
        registry.register(Box::new(feedback_total.clone()))?;

        Ok(Self {
            votes_total,
            vote_rejections_total,
            rating_delta,
            matchups_served_total,
            audit_failures_total,
            feedback_total,
        })
    }
}

impl StoreMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let health_status = IntGauge::new(
            "clout_rank_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let operation_timeouts_total = IntCounterVec::new(
            Opts::new(
                "clout_rank_store_timeouts_total",
                "Store operations that exceeded the timeout",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(operation_timeouts_total.clone()))?;

        Ok(Self {
            health_status,
            operation_timeouts_total,
        })
    }
}
