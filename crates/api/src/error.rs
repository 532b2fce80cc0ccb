//! Error-to-response mapping for handlers.
//!
//! Every failure leaves the API as `{ "error": CODE, "message": text }`.
//! Server-side failures are logged and their details are not echoed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use kasa_core::auth::PasswordError;
use kasa_core::ledger::LedgerError;
use kasa_core::order::OrderError;
use kasa_db::repositories::{
    DashboardError, LedgerRepoError, OrderRepoError, ProductError, UserError,
};
use kasa_shared::AppError;

/// Handler error carrying a status, a code and a public message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Builds an error from its parts.
    #[must_use]
    pub fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message: message.into(),
        }
    }

    /// 403 for a role that may not perform the operation.
    #[must_use]
    pub fn forbidden(message: &str) -> Self {
        AppError::Forbidden(message.to_string()).into()
    }

    /// 400 for malformed input.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into()).into()
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        if e.is_server_error() {
            error!(error = %e, "Request failed");
        }
        Self::new(e.status_code(), e.error_code(), e.public_message())
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::Database(e.to_string()).into()
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        Self::new(e.http_status_code(), e.error_code(), e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        if let LedgerError::Database(detail) = &e {
            return AppError::Database(detail.clone()).into();
        }
        Self::new(e.http_status_code(), e.error_code(), e.to_string())
    }
}

impl From<LedgerRepoError> for ApiError {
    fn from(e: LedgerRepoError) -> Self {
        match e {
            LedgerRepoError::Ledger(e) => e.into(),
            LedgerRepoError::Database(e) => e.into(),
        }
    }
}

impl From<OrderRepoError> for ApiError {
    fn from(e: OrderRepoError) -> Self {
        match e {
            OrderRepoError::NotFound(id) => {
                Self::new(404, "ORDER_NOT_FOUND", format!("Order not found: {id}"))
            }
            OrderRepoError::ClientNotFound(id) => {
                Self::new(404, "CLIENT_NOT_FOUND", format!("Client not found: {id}"))
            }
            OrderRepoError::NotAClient(id) => {
                Self::new(400, "NOT_A_CLIENT", format!("User {id} is not a client"))
            }
            OrderRepoError::Order(e) => e.into(),
            OrderRepoError::Database(e) => e.into(),
        }
    }
}

impl From<ProductError> for ApiError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::NotFound(id) => {
                Self::new(404, "PRODUCT_NOT_FOUND", format!("Product not found: {id}"))
            }
            ProductError::InUse(_) => Self::new(422, "PRODUCT_IN_USE", e.to_string()),
            ProductError::Invalid(message) => AppError::Validation(message).into(),
            ProductError::Database(e) => e.into(),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(id) => {
                Self::new(404, "USER_NOT_FOUND", format!("User not found: {id}"))
            }
            UserError::EmailTaken(_) => AppError::Conflict(e.to_string()).into(),
            UserError::CannotDeleteAdmin => Self::new(422, "CANNOT_DELETE_ADMIN", e.to_string()),
            UserError::HasPendingOrders(_) => Self::new(422, "HAS_PENDING_ORDERS", e.to_string()),
            UserError::HasOutstandingDebt(_) => {
                Self::new(422, "HAS_OUTSTANDING_DEBT", e.to_string())
            }
            UserError::Database(e) => e.into(),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::Order(e) => AppError::Internal(e.to_string()).into(),
            DashboardError::Database(e) => e.into(),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort => AppError::Validation(e.to_string()).into(),
            _ => AppError::Internal(e.to_string()).into(),
        }
    }
}
