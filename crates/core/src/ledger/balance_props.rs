//! Property-based tests for balance derivation.
//!
//! - Current balance is the negated sum of a (client, currency) pair
//! - Ordering of entries never changes a balance
//! - Snapshots chain: each entry's `before` is the previous entry's `after`

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use kasa_shared::types::{Currency, UserId};

use super::balance::BalanceDeriver;
use super::entry::{LedgerEntry, LedgerEntryKind, NewLedgerEntry};

/// Strategy for signed amounts (-10,000.00 to 10,000.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::Eur), Just(Currency::Mkd)]
}

/// Entries for a small pool of clients, one minute apart.
fn entries_strategy(clients: Vec<UserId>) -> impl Strategy<Value = Vec<LedgerEntry>> {
    let client_count = clients.len();
    prop::collection::vec(
        (0..client_count, currency_strategy(), signed_amount()),
        0..60,
    )
    .prop_map(move |raw| {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        raw.into_iter()
            .enumerate()
            .map(|(i, (client_idx, currency, amount))| {
                LedgerEntry::from_new(
                    NewLedgerEntry {
                        client_id: clients[client_idx],
                        currency,
                        amount,
                        kind: LedgerEntryKind::ManualAdjustment,
                        notes: String::new(),
                        order_id: None,
                        created_by: None,
                    },
                    base + Duration::minutes(i64::try_from(i).unwrap_or(0)),
                )
            })
            .collect()
    })
}

fn pool() -> Vec<UserId> {
    (0..3).map(|_| UserId::new()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_balance_is_negated_sum(entries in entries_strategy(pool())) {
        for entry in &entries {
            for currency in Currency::ALL {
                let expected: Decimal = -entries
                    .iter()
                    .filter(|e| e.client_id == entry.client_id && e.currency == currency)
                    .map(|e| e.amount)
                    .sum::<Decimal>();
                prop_assert_eq!(
                    BalanceDeriver::current_balance(&entries, entry.client_id, currency),
                    expected
                );
            }
        }
    }

    #[test]
    fn prop_balance_independent_of_order(entries in entries_strategy(pool())) {
        let mut reversed = entries.clone();
        reversed.reverse();
        for entry in &entries {
            let forward = BalanceDeriver::client_balance(&entries, entry.client_id);
            let backward = BalanceDeriver::client_balance(&reversed, entry.client_id);
            prop_assert_eq!(forward, backward);
        }
    }

    #[test]
    fn prop_balance_is_idempotent(entries in entries_strategy(pool())) {
        let totals_once = BalanceDeriver::aggregate_debt(&entries);
        let totals_twice = BalanceDeriver::aggregate_debt(&entries);
        prop_assert_eq!(totals_once, totals_twice);
    }

    #[test]
    fn prop_snapshots_chain(entries in entries_strategy(pool())) {
        for currency in Currency::ALL {
            let Some(first) = entries.first() else { continue };
            let client = first.client_id;
            let mut running = Decimal::ZERO;
            for entry in entries.iter().filter(|e| e.is_for(client, currency)) {
                let snapshot = BalanceDeriver::snapshot(&entries, entry);
                prop_assert_eq!(snapshot.before, running);
                prop_assert_eq!(snapshot.after, running - entry.amount);
                running = snapshot.after;
            }
            prop_assert_eq!(
                running,
                BalanceDeriver::current_balance(&entries, client, currency)
            );
        }
    }
}
