//! Kasa API Server
//!
//! Main entry point for the Kasa point-of-sale backend.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kasa_api::{AppState, create_router};
use kasa_core::currency::CategoryCurrencyPolicy;
use kasa_db::{OrderLocks, connect_with_pool};
use kasa_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kasa=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .context("JWT expiry out of range")?,
    });

    let policy = CategoryCurrencyPolicy::new(&config.pricing.eur_categories);
    info!(
        eur_categories = ?config.pricing.eur_categories,
        retention_days = config.ledger.retention_days,
        low_stock_threshold = config.inventory.low_stock_threshold,
        "Business settings loaded"
    );

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        policy: Arc::new(policy),
        order_locks: OrderLocks::new(),
        ledger: config.ledger.clone(),
        inventory: config.inventory.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
