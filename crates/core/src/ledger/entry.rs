//! Ledger entry domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasa_shared::types::{Currency, LedgerEntryId, OrderId, UserId};

/// What produced a ledger entry.
///
/// The sign of `amount` already tells whether debt went up or down; the kind
/// says why, so consumers never have to read the notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Order creation or an edit that increased what the client owes.
    OrderDebit,
    /// An order edit that decreased what the client owes.
    OrderCredit,
    /// Manual admin adjustment, either direction.
    ManualAdjustment,
}

impl LedgerEntryKind {
    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderDebit => "order_debit",
            Self::OrderCredit => "order_credit",
            Self::ManualAdjustment => "manual_adjustment",
        }
    }

    /// Order-driven kind for a signed ledger amount.
    #[must_use]
    pub fn for_order_amount(amount: Decimal) -> Self {
        if amount < Decimal::ZERO {
            Self::OrderDebit
        } else {
            Self::OrderCredit
        }
    }
}

impl std::fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry about to be appended. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// Client whose balance changes.
    pub client_id: UserId,
    /// Currency of the adjustment.
    pub currency: Currency,
    /// Signed amount: negative raises debt, positive lowers it.
    pub amount: Decimal,
    /// Classification.
    pub kind: LedgerEntryKind,
    /// Human-readable description.
    pub notes: String,
    /// Order that produced the entry, if any.
    pub order_id: Option<OrderId>,
    /// Acting user; `None` is the system actor.
    pub created_by: Option<UserId>,
}

/// A persisted, immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID.
    pub id: LedgerEntryId,
    /// Owning client.
    pub client_id: UserId,
    /// Currency.
    pub currency: Currency,
    /// Signed amount.
    pub amount: Decimal,
    /// Classification.
    pub kind: LedgerEntryKind,
    /// Human-readable description.
    pub notes: String,
    /// Originating order, if still present.
    pub order_id: Option<OrderId>,
    /// Acting user; `None` is the system actor.
    pub created_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Materializes a new entry with a fresh id and the given timestamp.
    #[must_use]
    pub fn from_new(entry: NewLedgerEntry, created_at: DateTime<Utc>) -> Self {
        Self {
            id: LedgerEntryId::new(),
            client_id: entry.client_id,
            currency: entry.currency,
            amount: entry.amount,
            kind: entry.kind,
            notes: entry.notes,
            order_id: entry.order_id,
            created_by: entry.created_by,
            created_at,
        }
    }

    /// Change in debt caused by this entry (positive means more owed).
    #[must_use]
    pub fn debt_effect(&self) -> Decimal {
        -self.amount
    }

    /// Returns true if this entry belongs to the (client, currency) pair.
    #[must_use]
    pub fn is_for(&self, client_id: UserId, currency: Currency) -> bool {
        self.client_id == client_id && self.currency == currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_follows_amount_sign() {
        assert_eq!(
            LedgerEntryKind::for_order_amount(dec!(-25)),
            LedgerEntryKind::OrderDebit
        );
        assert_eq!(
            LedgerEntryKind::for_order_amount(dec!(25)),
            LedgerEntryKind::OrderCredit
        );
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&LedgerEntryKind::ManualAdjustment).unwrap(),
            "\"manual_adjustment\""
        );
        assert_eq!(LedgerEntryKind::OrderDebit.to_string(), "order_debit");
    }

    #[test]
    fn test_debt_effect_is_negated_amount() {
        let entry = LedgerEntry::from_new(
            NewLedgerEntry {
                client_id: UserId::new(),
                currency: Currency::Eur,
                amount: dec!(-100),
                kind: LedgerEntryKind::OrderDebit,
                notes: String::new(),
                order_id: None,
                created_by: None,
            },
            Utc::now(),
        );
        assert_eq!(entry.debt_effect(), dec!(100));
    }
}
