//! Balance derivation from the ledger.
//!
//! There is no stored balance anywhere. Every figure here is recomputed from
//! ledger entries, so correctness only depends on the ledger being complete.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasa_shared::types::{Currency, UserId};

use super::entry::LedgerEntry;
use crate::currency::CurrencyTotals;

/// A client's debt in every currency.
///
/// Values are the true signed debt: positive means owed, negative means the
/// client holds credit. Presentation layers decide whether to clamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBalance {
    /// Client ID.
    pub client_id: UserId,
    /// Debt per currency.
    pub debt: CurrencyTotals,
}

impl ClientBalance {
    /// Debt in one currency.
    #[must_use]
    pub fn debt_in(&self, currency: Currency) -> Decimal {
        self.debt.get(currency)
    }

    /// Returns true if the client holds credit in `currency`.
    #[must_use]
    pub fn is_credit(&self, currency: Currency) -> bool {
        self.debt_in(currency) < Decimal::ZERO
    }
}

/// Debt immediately before and after one ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSnapshot {
    /// Debt before the entry was applied.
    pub before: Decimal,
    /// Debt after the entry was applied.
    pub after: Decimal,
}

impl DebtSnapshot {
    /// Builds a snapshot from the sum of earlier amounts and the entry amount.
    #[must_use]
    pub fn from_prior_sum(prior_amount_sum: Decimal, entry_amount: Decimal) -> Self {
        let before = BalanceDeriver::debt_from_sum(prior_amount_sum);
        Self {
            before,
            after: before - entry_amount,
        }
    }
}

/// Derives balances from ledger entries.
pub struct BalanceDeriver;

impl BalanceDeriver {
    /// Converts a sum of signed ledger amounts into debt.
    #[must_use]
    pub fn debt_from_sum(amount_sum: Decimal) -> Decimal {
        -amount_sum
    }

    /// Current debt of `client_id` in `currency`.
    pub fn current_balance<'a, I>(entries: I, client_id: UserId, currency: Currency) -> Decimal
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let sum: Decimal = entries
            .into_iter()
            .filter(|e| e.is_for(client_id, currency))
            .map(|e| e.amount)
            .sum();
        Self::debt_from_sum(sum)
    }

    /// Current debt of `client_id` in every currency.
    pub fn client_balance<'a, I>(entries: I, client_id: UserId) -> ClientBalance
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let debt = entries
            .into_iter()
            .filter(|e| e.client_id == client_id)
            .map(|e| (e.currency, e.debt_effect()))
            .collect();
        ClientBalance { client_id, debt }
    }

    /// Total debt across all given entries, per currency.
    pub fn aggregate_debt<'a, I>(entries: I) -> CurrencyTotals
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        entries
            .into_iter()
            .map(|e| (e.currency, e.debt_effect()))
            .collect()
    }

    /// Debt before and after `target`.
    ///
    /// `before` sums the same client and currency strictly earlier than the
    /// target's `created_at`. `after` applies the target's signed amount.
    pub fn snapshot<'a, I>(entries: I, target: &LedgerEntry) -> DebtSnapshot
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let prior: Decimal = entries
            .into_iter()
            .filter(|e| e.is_for(target.client_id, target.currency))
            .filter(|e| e.created_at < target.created_at)
            .map(|e| e.amount)
            .sum();
        DebtSnapshot::from_prior_sum(prior, target.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::entry::{LedgerEntryKind, NewLedgerEntry};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn entry(client: UserId, currency: Currency, amount: Decimal, minute: i64) -> LedgerEntry {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        LedgerEntry::from_new(
            NewLedgerEntry {
                client_id: client,
                currency,
                amount,
                kind: LedgerEntryKind::ManualAdjustment,
                notes: String::new(),
                order_id: None,
                created_by: None,
            },
            base + Duration::minutes(minute),
        )
    }

    #[test]
    fn test_order_then_manual_reduction() {
        let client = UserId::new();
        let entries = vec![
            entry(client, Currency::Eur, dec!(-100), 0),
            entry(client, Currency::Eur, dec!(40), 1),
        ];

        assert_eq!(
            BalanceDeriver::current_balance(&entries, client, Currency::Eur),
            dec!(60)
        );
        assert_eq!(
            BalanceDeriver::current_balance(&entries, client, Currency::Mkd),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_balance_ignores_other_clients_and_currencies() {
        let client = UserId::new();
        let other = UserId::new();
        let entries = vec![
            entry(client, Currency::Mkd, dec!(-25), 0),
            entry(other, Currency::Mkd, dec!(-1000), 1),
            entry(client, Currency::Eur, dec!(-7), 2),
        ];

        let balance = BalanceDeriver::client_balance(&entries, client);
        assert_eq!(balance.debt_in(Currency::Mkd), dec!(25));
        assert_eq!(balance.debt_in(Currency::Eur), dec!(7));
    }

    #[test]
    fn test_overpayment_is_credit_not_clamped() {
        let client = UserId::new();
        let entries = vec![
            entry(client, Currency::Eur, dec!(-50), 0),
            entry(client, Currency::Eur, dec!(80), 1),
        ];

        let balance = BalanceDeriver::client_balance(&entries, client);
        assert_eq!(balance.debt_in(Currency::Eur), dec!(-30));
        assert!(balance.is_credit(Currency::Eur));
    }

    #[test]
    fn test_snapshot_uses_signed_amount() {
        let client = UserId::new();
        let entries = vec![
            entry(client, Currency::Mkd, dec!(-100), 0),
            entry(client, Currency::Mkd, dec!(-25), 1),
            entry(client, Currency::Mkd, dec!(30), 2),
            entry(client, Currency::Eur, dec!(-999), 1),
        ];

        let increase = BalanceDeriver::snapshot(&entries, &entries[1]);
        assert_eq!(increase.before, dec!(100));
        assert_eq!(increase.after, dec!(125));

        let reduction = BalanceDeriver::snapshot(&entries, &entries[2]);
        assert_eq!(reduction.before, dec!(125));
        assert_eq!(reduction.after, dec!(95));

        let first = BalanceDeriver::snapshot(&entries, &entries[0]);
        assert_eq!(first.before, Decimal::ZERO);
        assert_eq!(first.after, dec!(100));
    }

    #[test]
    fn test_aggregate_debt_across_clients() {
        let entries = vec![
            entry(UserId::new(), Currency::Eur, dec!(-10), 0),
            entry(UserId::new(), Currency::Eur, dec!(-15), 0),
            entry(UserId::new(), Currency::Mkd, dec!(-300), 0),
        ];

        let totals = BalanceDeriver::aggregate_debt(&entries);
        assert_eq!(totals.get(Currency::Eur), dec!(25));
        assert_eq!(totals.get(Currency::Mkd), dec!(300));
    }
}
