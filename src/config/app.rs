//! Main application configuration
//!
//! This module defines the primary configuration structures for the clout-rank
//! service, including environment variable and TOML loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::rating::RatingConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub rating: RatingConfig,
    pub auth: AuthSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single request, in milliseconds
    pub request_timeout_ms: u64,
    /// Allowed CORS origins. A leading `*.` matches any subdomain.
    pub cors_allowed_origins: Vec<String>,
}

/// Which entity store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(anyhow!("Unknown store backend: {}", other)),
        }
    }
}

/// Entity store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// PostgreSQL connection string, required for the postgres backend
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Upper bound on each store operation, in milliseconds
    pub operation_timeout_ms: u64,
    /// JSON file of companies loaded at startup
    pub seed_file: Option<PathBuf>,
    /// Create tables on startup when missing
    pub auto_migrate: bool,
}

/// Bearer token table for voter identification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// token -> verified subject
    pub tokens: HashMap<String, String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "clout-rank".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_ms: 10_000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 10,
            operation_timeout_ms: 5_000,
            seed_file: None,
            auto_migrate: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then let environment variables
    /// override individual keys
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Server settings
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_MS") {
            self.server.request_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid REQUEST_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(origins) = env::var("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        // Store settings
        if let Ok(backend) = env::var("STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.store.database_url = Some(url);
        }
        if let Ok(max) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = max
                .parse()
                .map_err(|_| anyhow!("Invalid DATABASE_MAX_CONNECTIONS value: {}", max))?;
        }
        if let Ok(timeout) = env::var("STORE_TIMEOUT_MS") {
            self.store.operation_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid STORE_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(seed) = env::var("SEED_FILE") {
            self.store.seed_file = Some(PathBuf::from(seed));
        }
        if let Ok(migrate) = env::var("AUTO_MIGRATE") {
            self.store.auto_migrate = migrate
                .parse()
                .map_err(|_| anyhow!("Invalid AUTO_MIGRATE value: {}", migrate))?;
        }

        // Rating settings
        if let Ok(k) = env::var("ELO_K_FACTOR") {
            self.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k))?;
        }
        if let Ok(initial) = env::var("INITIAL_RATING") {
            self.rating.initial_rating = initial
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING value: {}", initial))?;
        }

        // Auth settings
        if let Ok(tokens) = env::var("AUTH_TOKENS") {
            self.auth.tokens = parse_token_table(&tokens)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get per-request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// Get per-operation store timeout as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store.operation_timeout_ms)
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse `token:subject` pairs separated by commas
fn parse_token_table(raw: &str) -> Result<HashMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (token, subject) = entry
                .split_once(':')
                .ok_or_else(|| anyhow!("Invalid AUTH_TOKENS entry: {}", entry))?;
            if token.is_empty() || subject.is_empty() {
                return Err(anyhow!("Invalid AUTH_TOKENS entry: {}", entry));
            }
            Ok((token.to_string(), subject.to_string()))
        })
        .collect()
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.server.port == 0 {
        return Err(anyhow!("Server port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.server.request_timeout_ms == 0 {
        return Err(anyhow!("Request timeout must be greater than 0"));
    }
    if config.store.operation_timeout_ms == 0 {
        return Err(anyhow!("Store operation timeout must be greater than 0"));
    }

    // Validate store settings
    if config.store.max_connections == 0 {
        return Err(anyhow!("Store max connections must be greater than 0"));
    }
    if config.store.backend == StoreBackend::Postgres
        && config
            .store
            .database_url
            .as_deref()
            .map(str::is_empty)
            .unwrap_or(true)
    {
        return Err(anyhow!("DATABASE_URL is required for the postgres backend"));
    }

    // Validate rating settings
    config.rating.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.rating.k_factor, 32.0);
        assert_eq!(config.rating.initial_rating, 1500);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_postgres_requires_url() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Postgres;
        assert!(validate_config(&config).is_err());

        config.store.database_url = Some("postgres://localhost/clout".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = AppConfig::default();
        config.store.operation_timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.server.request_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [store]
            backend = "postgres"
            database_url = "postgres://db/clout"

            [rating]
            k_factor = 24.0

            [auth.tokens]
            abc = "user-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.rating.k_factor, 24.0);
        assert_eq!(config.rating.initial_rating, 1500);
        assert_eq!(config.auth.tokens.get("abc").map(String::as_str), Some("user-1"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_parse_token_table() {
        let table = parse_token_table("t1:alice, t2:bob").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["t2"], "bob");

        assert!(parse_token_table("missing-colon").is_err());
        assert!(parse_token_table(":nobody").is_err());
        assert!(parse_token_table("").unwrap().is_empty());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("PostgreSQL".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }
}
