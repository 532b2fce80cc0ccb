//! Client debt routes: manual adjustments, balances, the debt log and
//! retention purge.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::page_request;
use crate::{AppState, error::ApiError, middleware::AuthUser};
use kasa_core::ledger::{ClientBalance, ManualAdjustmentInput};
use kasa_db::repositories::{DebtLogFilter, DebtLogItem};
use kasa_shared::{PageResponse, types::UserId};

/// Creates the debt router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients/{id}/debt-adjustments", post(create_adjustment))
        .route("/clients/{id}/balance", get(get_balance))
        .route("/debt-log", get(list_debt_log))
        .route("/debt-log/purge", delete(purge_debt_log))
}

/// Request body for a manual adjustment.
///
/// `amount` is accepted as a JSON number or string; positive reduces the
/// debt, negative increases it.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    /// Signed amount.
    pub amount: Value,
    /// Currency code, `EUR` or `MKD`.
    pub currency: String,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Debt log query parameters.
#[derive(Debug, Deserialize)]
pub struct DebtLogQuery {
    /// Case-insensitive substring of the client name.
    pub client_name: Option<String>,
    /// Creation day, `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    /// Restrict to one client. Ignored for clients.
    pub client_id: Option<UserId>,
    /// Page number.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Result of a retention purge.
#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    /// Entries removed.
    pub removed: u64,
    /// Window that was kept.
    pub retention_days: u32,
}

fn amount_text(amount: &Value) -> Result<String, ApiError> {
    match amount {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ApiError::validation("Amount must be a number")),
    }
}

/// POST /clients/{id}/debt-adjustments - Record a payment or a charge.
async fn create_adjustment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<UserId>,
    Json(payload): Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<DebtLogItem>), ApiError> {
    user.require_admin()?;
    let item = state
        .ledger()
        .manual_adjustment(ManualAdjustmentInput {
            client_id,
            amount: amount_text(&payload.amount)?,
            currency: payload.currency,
            notes: payload.notes,
            created_by: user.user_id(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /clients/{id}/balance - Current debt per currency.
async fn get_balance(
    State(state): State<AppState>,
    user: AuthUser,
    Path(client_id): Path<UserId>,
) -> Result<Json<ClientBalance>, ApiError> {
    user.require_view(client_id)?;
    if state.users().find_by_id(client_id).await?.is_none() {
        return Err(ApiError::new(
            404,
            "CLIENT_NOT_FOUND",
            format!("Client not found: {client_id}"),
        ));
    }
    Ok(Json(state.ledger().client_balance(client_id).await?))
}

/// GET /debt-log - Ledger entries newest first with debt snapshots.
async fn list_debt_log(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DebtLogQuery>,
) -> Result<Json<PageResponse<DebtLogItem>>, ApiError> {
    let filter = if user.is_admin() {
        DebtLogFilter {
            client_name: query.client_name,
            date: query.date,
            client_id: query.client_id,
        }
    } else {
        DebtLogFilter {
            client_name: None,
            date: query.date,
            client_id: Some(user.user_id()),
        }
    };
    let page = state
        .ledger()
        .debt_log(&filter, page_request(query.page, query.per_page))
        .await?;
    Ok(Json(page))
}

/// DELETE /debt-log/purge - Remove entries past the retention window.
async fn purge_debt_log(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PurgeResponse>, ApiError> {
    user.require_admin()?;
    let retention_days = state.ledger.retention_days;
    let removed = state
        .ledger()
        .purge_expired(Utc::now(), retention_days)
        .await?;
    Ok(Json(PurgeResponse {
        removed,
        retention_days,
    }))
}
