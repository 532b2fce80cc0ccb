//! Ledger error types.

use thiserror::Error;

use kasa_shared::types::UserId;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Currency is not one of EUR, MKD.
    #[error("Invalid currency '{0}', expected EUR or MKD")]
    InvalidCurrency(String),

    /// Amount is not a decimal number.
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// A zero adjustment carries no information.
    #[error("Adjustment amount cannot be zero")]
    ZeroAmount,

    /// Retention window must be at least one day.
    #[error("Retention period must be at least one day")]
    InvalidRetention,

    // ========== Client Errors ==========
    /// Client does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(UserId),

    /// Ledger entries may only be attached to client accounts.
    #[error("User {0} is not a client")]
    NotAClient(UserId),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::InvalidRetention => "INVALID_RETENTION",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::NotAClient(_) => "NOT_A_CLIENT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidCurrency(_)
            | Self::InvalidAmount(_)
            | Self::ZeroAmount
            | Self::InvalidRetention
            | Self::NotAClient(_) => 400,
            Self::ClientNotFound(_) => 404,
            Self::Database(_) => 500,
        }
    }
}
