//! Booking Payments API Server
//!
//! # Usage
//!
//! ```bash
//! # In-memory stores, gateway credentials from the environment
//! API_GATEWAY_BASE_URL=https://gateway.example API_GATEWAY_MERCHANT_ID=... \
//!   API_GATEWAY_TOKEN=... API_CALLBACK_SECRET=... cargo run --bin booking-payments-api
//!
//! # PostgreSQL-backed
//! API_DATABASE_URL=postgres://localhost/bookings cargo run --bin booking-payments-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST`, `API_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET`, `API_JWT_EXPIRATION_SECS` - Staff token signing
//! * `API_DATABASE_URL` - PostgreSQL connection string; in-memory when unset
//! * `API_LOG_LEVEL`, `API_LOG_JSON` - Log filter and format (`RUST_LOG` wins)
//! * `API_APP_URL` - Public admin URL used for gateway callback/return URLs
//! * `API_GATEWAY_BASE_URL`, `API_GATEWAY_MERCHANT_ID`, `API_GATEWAY_TOKEN`,
//!   `API_GATEWAY_TIMEOUT_SECS` - Payment gateway
//! * `API_CALLBACK_SECRET` - Callback signature secret
//! * `API_CURRENCY`, `API_MAX_ATTEMPTS`, `API_INTENT_TTL_HOURS`,
//!   `API_SWEEP_INTERVAL_SECS` - Orchestrator limits
//! * `API_PUSH_ENDPOINT`, `API_PUSH_TOKEN` - Push delivery service

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_notification::{HttpPushSender, InMemoryUserDirectory, NotificationService, UserDirectory};
use domain_payment::{HttpGatewayClient, InMemoryIntentStore, IntentStore, PaymentOrchestrator};
use infra_db::{create_pool, DatabaseConfig, PostgresIntentStore, PostgresUserDirectory};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional in local development
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting booking payments API server"
    );

    if let Some(field) = config.gateway_credentials().missing_field() {
        tracing::warn!(field, "Payment gateway is not fully configured; initiate and verify will fail");
    }
    if config.callback_secret.is_empty() {
        tracing::warn!("API_CALLBACK_SECRET is empty; every gateway callback will be rejected");
    }

    let (store, directory) = build_stores(&config).await?;

    let gateway = HttpGatewayClient::new(config.gateway_credentials())
        .context("building payment gateway client")?;
    let push = HttpPushSender::new(config.push_credentials())
        .context("building push sender")?;

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store,
        Arc::new(gateway),
        config.orchestrator_config().context("invalid API_CURRENCY")?,
    ));
    let notifications = Arc::new(NotificationService::new(directory, Arc::new(push)));

    if config.sweep_interval_secs > 0 {
        spawn_sweeper(orchestrator.clone(), Duration::from_secs(config.sweep_interval_secs));
    }

    let addr: SocketAddr = config.server_addr().parse().context("invalid bind address")?;
    let app = create_router(AppState::new(orchestrator, notifications, config));

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads `API_*` configuration; a value that does not parse stops startup
fn load_config() -> anyhow::Result<ApiConfig> {
    ApiConfig::from_env().context("loading API_* configuration")
}

fn init_tracing(config: &ApiConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).init();
    }
}

/// PostgreSQL adapters when a database URL is configured, in-memory otherwise
async fn build_stores(
    config: &ApiConfig,
) -> anyhow::Result<(Arc<dyn IntentStore>, Arc<dyn UserDirectory>)> {
    match config.database_url() {
        Some(url) => {
            let pool = create_pool(DatabaseConfig::new(url))
                .await
                .context("connecting to PostgreSQL")?;
            let store: Arc<dyn IntentStore> = Arc::new(PostgresIntentStore::new(pool.clone()));
            let directory: Arc<dyn UserDirectory> = Arc::new(PostgresUserDirectory::new(pool));
            Ok((store, directory))
        }
        None => {
            tracing::warn!("API_DATABASE_URL not set; intents and users are kept in memory");
            let store: Arc<dyn IntentStore> = Arc::new(InMemoryIntentStore::new());
            let directory: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::new());
            Ok((store, directory))
        }
    }
}

fn spawn_sweeper(orchestrator: Arc<PaymentOrchestrator>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = orchestrator.sweep_expired(chrono::Utc::now()).await {
                tracing::error!(error = %err, "Expiry sweep failed");
            }
        }
    });
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
