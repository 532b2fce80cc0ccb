//! Client debt ledger.
//!
//! This module implements the append-only debt ledger:
//! - Ledger entries (signed adjustments per client and currency)
//! - Entry classification (order debit, order credit, manual adjustment)
//! - Validation of manual adjustments and retention cutoffs
//! - Balance derivation (current debt, historical before/after snapshots)
//!
//! Sign convention: a negative `amount` increases the client's debt, a
//! positive `amount` reduces it. Debt is always `-sum(amount)`.

pub mod balance;
pub mod entry;
pub mod error;
pub mod service;

#[cfg(test)]
mod balance_props;

pub use balance::{BalanceDeriver, ClientBalance, DebtSnapshot};
pub use entry::{LedgerEntry, LedgerEntryKind, NewLedgerEntry};
pub use error::LedgerError;
pub use service::{LedgerService, ManualAdjustmentInput};
