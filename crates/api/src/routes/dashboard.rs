//! Admin dashboard route.

use axum::{Json, Router, extract::State, routing::get};

use crate::{AppState, error::ApiError, middleware::AuthUser};
use kasa_core::dashboard::DashboardSummary;

/// Creates the dashboard router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// GET /dashboard - Revenue, outstanding debt, order counts and low stock.
async fn get_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardSummary>, ApiError> {
    user.require_admin()?;
    let summary = state
        .dashboard()
        .summary(state.inventory.low_stock_threshold)
        .await?;
    Ok(Json(summary))
}
