//! Main application state and service coordination
//!
//! `AppState` wires the configured store, rating calculator and identity
//! verifier into the ranking service, and owns the HTTP server task.

use crate::api::{create_router, ApiServer, ApiState};
use crate::auth::{IdentityVerifier, TokenTableVerifier};
use crate::config::{AppConfig, StoreBackend};
use crate::metrics::MetricsCollector;
use crate::rating::{EloRatingCalculator, RatingCalculator};
use crate::service::health::HealthCheck;
use crate::service::rankings::RankingService;
use crate::store::{seed_from_file, EntityStore, InMemoryEntityStore, PgEntityStore};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Store connection error: {message}")]
    StoreConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("HTTP server error: {message}")]
    Server { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    store: Arc<dyn EntityStore>,
    rankings: Arc<RankingService>,
    health: Arc<HealthCheck>,
    metrics: Arc<MetricsCollector>,

    /// HTTP server, present once started
    server: Option<Arc<ApiServer>>,
    local_addr: Option<SocketAddr>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} ranking service", config.service.name);
        info!(
            "Configuration: store={}, k_factor={}, initial_rating={}",
            config.store.backend, config.rating.k_factor, config.rating.initial_rating
        );

        let store = Self::initialize_store(&config).await?;

        if let Some(seed_file) = &config.store.seed_file {
            let seeded = seed_from_file(store.as_ref(), seed_file)
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to seed companies: {:#}", e),
                })?;
            info!("Seeded {} companies from {}", seeded, seed_file.display());
        }

        let calculator =
            Arc::new(
                EloRatingCalculator::new(&config.rating).map_err(|e| {
                    ServiceError::Configuration {
                        message: format!("Invalid rating configuration: {}", e),
                    }
                })?,
            );

        let verifier = Arc::new(TokenTableVerifier::new(config.auth.tokens.clone()));
        if verifier.is_empty() {
            info!("No voter tokens configured; all votes will be anonymous");
        }

        Self::with_components(config, store, calculator, verifier)
    }

    /// Assemble the application from already built components
    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn EntityStore>,
        calculator: Arc<dyn RatingCalculator>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Result<Self, ServiceError> {
        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let rankings = Arc::new(RankingService::new(
            store.clone(),
            calculator,
            verifier,
            metrics.clone(),
            config.store_timeout(),
        ));
        let health = Arc::new(HealthCheck::new(
            store.clone(),
            metrics.clone(),
            config.service.name.clone(),
            config.store_timeout(),
        ));

        Ok(Self {
            config,
            store,
            rankings,
            health,
            metrics,
            server: None,
            local_addr: None,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Bind the HTTP listener and start serving
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} ranking service", self.config.service.name);

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::Server {
                message: format!("Failed to bind {}: {}", address, e),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServiceError::Server {
            message: format!("Failed to read local address: {}", e),
        })?;

        let router = create_router(self.api_state(), &self.config.server);
        let server = Arc::new(ApiServer::new(router));
        let task_server = server.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = task_server.serve(listener).await {
                error!("HTTP server failed: {}", e);
            } else {
                info!("HTTP server task completed");
            }
        });

        self.background_tasks.push(handle);
        self.server = Some(server);
        self.local_addr = Some(local_addr);
        *self.is_running.write().await = true;

        info!("✅ Listening on http://{}", local_addr);
        Ok(())
    }

    /// Stop accepting requests and wait for in-flight ones, bounded by the
    /// configured shutdown timeout
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown");

        *self.is_running.write().await = false;

        if let Some(server) = self.server.take() {
            server.stop();
        }

        let timeout = self.config.shutdown_timeout();
        for handle in self.background_tasks.drain(..) {
            let abort = handle.abort_handle();
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Background task ended abnormally: {}", e),
                Err(_) => {
                    warn!("Shutdown timeout of {:?} exceeded, aborting task", timeout);
                    abort.abort();
                }
            }
        }

        info!("✅ Shutdown completed");
        Ok(())
    }

    /// Handles shared with the HTTP layer
    pub fn api_state(&self) -> ApiState {
        ApiState {
            rankings: self.rankings.clone(),
            health: self.health.clone(),
            metrics: self.metrics.clone(),
            request_timeout: self.config.request_timeout(),
        }
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn store(&self) -> Arc<dyn EntityStore> {
        self.store.clone()
    }

    pub fn rankings(&self) -> Arc<RankingService> {
        self.rankings.clone()
    }

    pub fn health(&self) -> Arc<HealthCheck> {
        self.health.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Address the server bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    async fn initialize_store(config: &AppConfig) -> Result<Arc<dyn EntityStore>, ServiceError> {
        let initial_rating = config.rating.initial_rating;

        match config.store.backend {
            StoreBackend::Memory => {
                info!("Using in-memory entity store");
                Ok(Arc::new(InMemoryEntityStore::new(initial_rating)))
            }
            StoreBackend::Postgres => {
                info!(
                    "Connecting to PostgreSQL (max {} connections)",
                    config.store.max_connections
                );
                let store = PgEntityStore::connect(&config.store, initial_rating)
                    .await
                    .map_err(|e| ServiceError::StoreConnection {
                        message: e.to_string(),
                    })?;

                if config.store.auto_migrate {
                    store
                        .migrate()
                        .await
                        .map_err(|e| ServiceError::Initialization {
                            message: format!("Failed to apply schema: {}", e),
                        })?;
                    info!("Database schema is up to date");
                }

                Ok(Arc::new(store))
            }
        }
    }
}
