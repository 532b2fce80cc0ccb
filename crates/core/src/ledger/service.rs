//! Ledger service: validation of manual adjustments and retention rules.
//!
//! Pure business logic with no database dependencies. Repositories call into
//! this before appending to the ledger store.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use kasa_shared::types::{Currency, Money, UserId, fits_money_column};

use super::entry::{LedgerEntryKind, NewLedgerEntry};
use super::error::LedgerError;

/// Raw manual adjustment as received from an admin.
#[derive(Debug, Clone)]
pub struct ManualAdjustmentInput {
    /// Client whose debt changes.
    pub client_id: UserId,
    /// Signed amount as text: positive reduces debt, negative increases it.
    pub amount: String,
    /// Currency code.
    pub currency: String,
    /// Optional free-text notes.
    pub notes: Option<String>,
    /// Admin performing the adjustment.
    pub created_by: UserId,
}

/// Ledger service for entry validation.
pub struct LedgerService;

impl LedgerService {
    /// Parses a currency code.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidCurrency` for anything but EUR/MKD.
    pub fn parse_currency(code: &str) -> Result<Currency, LedgerError> {
        Currency::from_str(code).map_err(|_| LedgerError::InvalidCurrency(code.to_string()))
    }

    /// Parses a decimal amount from text.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` if the text is not a decimal.
    pub fn parse_amount(text: &str) -> Result<Decimal, LedgerError> {
        let trimmed = text.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| LedgerError::InvalidAmount(text.to_string()))
    }

    /// Validates a manual adjustment and turns it into an entry to append.
    ///
    /// The resulting balance is never checked: a client may end up owing
    /// nothing or holding credit.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` on a bad currency, an unparsable or zero amount,
    /// or one with more than four decimal places or beyond `MAX_AMOUNT`.
    pub fn manual_adjustment(input: ManualAdjustmentInput) -> Result<NewLedgerEntry, LedgerError> {
        let currency = Self::parse_currency(&input.currency)?;
        let amount = Self::parse_amount(&input.amount)?.normalize();
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        if !fits_money_column(amount) {
            return Err(LedgerError::InvalidAmount(input.amount));
        }

        let notes = input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_manual_note(Money::new(amount, currency)));

        Ok(NewLedgerEntry {
            client_id: input.client_id,
            currency,
            amount,
            kind: LedgerEntryKind::ManualAdjustment,
            notes,
            order_id: None,
            created_by: Some(input.created_by),
        })
    }

    /// Cutoff before which entries are purged by the retention cleanup.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidRetention` for a zero-day window.
    pub fn retention_cutoff(
        now: DateTime<Utc>,
        retention_days: u32,
    ) -> Result<DateTime<Utc>, LedgerError> {
        if retention_days == 0 {
            return Err(LedgerError::InvalidRetention);
        }
        Ok(now - Duration::days(i64::from(retention_days)))
    }
}

fn default_manual_note(adjustment: Money) -> String {
    if adjustment.is_negative() {
        format!("Manual debt increase of {}", -adjustment)
    } else {
        format!("Manual debt reduction of {adjustment}")
    }
}
