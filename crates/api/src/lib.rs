//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Authentication middleware and the `AuthUser` extractor
//! - Error-to-JSON mapping

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kasa_core::currency::CurrencyPolicy;
use kasa_db::OrderLocks;
use kasa_db::repositories::{
    DashboardRepository, LedgerRepository, OrderRepository, ProductRepository, UserRepository,
};
use kasa_shared::{InventoryConfig, JwtService, LedgerConfig};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Category to settlement currency routing.
    pub policy: Arc<dyn CurrencyPolicy>,
    /// Per-order mutation locks shared by every request.
    pub order_locks: OrderLocks,
    /// Debt log retention.
    pub ledger: LedgerConfig,
    /// Low-stock reporting.
    pub inventory: InventoryConfig,
}

impl AppState {
    /// Order repository bound to the shared policy and locks.
    #[must_use]
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(
            (*self.db).clone(),
            Arc::clone(&self.policy),
            self.order_locks.clone(),
        )
    }

    /// Ledger repository.
    #[must_use]
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new((*self.db).clone())
    }

    /// Product repository.
    #[must_use]
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new((*self.db).clone())
    }

    /// User repository.
    #[must_use]
    pub fn users(&self) -> UserRepository {
        UserRepository::new((*self.db).clone())
    }

    /// Dashboard repository.
    #[must_use]
    pub fn dashboard(&self) -> DashboardRepository {
        DashboardRepository::new((*self.db).clone(), self.orders())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
