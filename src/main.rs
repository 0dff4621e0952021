//! Main entry point for the Clout Rank service
//!
//! Loads configuration, initializes logging, wires the application state and
//! serves the HTTP API until SIGINT or SIGTERM.

use anyhow::Result;
use clap::Parser;
use clout_rank::config::{validate_config, AppConfig, StoreBackend};
use clout_rank::service::AppState;
use clout_rank::types::HealthStatus;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

/// Clout Rank - pairwise voting and Elo leaderboards for companies
#[derive(Parser)]
#[command(
    name = "clout-rank",
    version,
    about = "Pairwise voting and Elo ranking service",
    long_about = "Clout Rank serves random company matchups, applies head-to-head votes with an \
                 Elo rating update, and exposes paginated leaderboards plus per-company ratings \
                 and comments over HTTP in JSON or a compact binary encoding."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Check store connectivity and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(short, long, value_name = "PORT", help = "Override HTTP server port")]
    port: Option<u16>,

    /// Database URL override
    #[arg(long, value_name = "URL", help = "Override PostgreSQL connection URL")]
    database_url: Option<String>,

    /// Store backend override
    #[arg(long, value_name = "BACKEND", help = "Entity store backend (memory, postgres)")]
    store: Option<StoreBackend>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Perform health check and exit with 0 when healthy
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    };

    let report = app_state.health().check().await;
    println!("Health Check: {}", report.status.as_str());
    println!("  Service: {} {}", report.service, report.version);
    println!("  Database: {}", report.database);

    if report.status == HealthStatus::Healthy {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Clout Rank");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listen: {}", config.bind_address());
    info!("   Store: {}", config.store.backend);
    info!(
        "   Elo: K={} initial={}",
        config.rating.k_factor, config.rating.initial_rating
    );
    info!("   Voter tokens: {}", config.auth.tokens.len());
}

/// Load and merge configuration from environment, file and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Flags win over file and environment
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(database_url) = &args.database_url {
        config.store.database_url = Some(database_url.clone());
        if args.store.is_none() {
            config.store.backend = StoreBackend::Postgres;
        }
    }

    if let Some(store) = args.store {
        config.store.backend = store;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Some(config_path) = &args.config {
        info!("Loaded configuration from: {}", config_path.display());
    }

    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Clout Rank is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    if let Err(e) = app_state.shutdown().await {
        warn!("⚠️  Shutdown finished with errors: {}", e);
    }

    info!("🛑 Clout Rank stopped");
    Ok(())
}
