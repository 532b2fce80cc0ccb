//! Human-readable notes for order-driven ledger entries.
//!
//! Notes are for people reading the debt log. Nothing parses them back.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use kasa_shared::types::{Currency, OrderId};

use super::diff::{ItemChangeKind, ItemDiff};

/// Short order reference used in notes and invoice numbers.
#[must_use]
pub fn short_id(order_id: OrderId) -> String {
    let full = order_id.into_inner().simple().to_string();
    full[full.len().saturating_sub(8)..].to_string()
}

/// Note for the debt written when a pending client order is created.
#[must_use]
pub fn creation_note(order_id: OrderId, currency: Currency, debt_increase: Decimal) -> String {
    format!(
        "Order #{} created: debt increased by {:.2} {}",
        short_id(order_id),
        debt_increase,
        currency
    )
}

/// Note for the consolidated entry of an item edit in one currency.
///
/// Lists added, removed and changed products settled in `currency`, then
/// the net effect.
#[must_use]
pub fn edit_note(order_id: OrderId, diff: &ItemDiff, currency: Currency, net_change: Decimal) -> String {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut changed = Vec::new();

    for change in diff.changes_in(currency) {
        let value = change.value();
        match change.kind {
            ItemChangeKind::Added => added.push(format!(
                "{} x{} ({:+.2})",
                change.product_name, change.new_quantity, value
            )),
            ItemChangeKind::Removed => removed.push(format!(
                "{} x{} ({:+.2})",
                change.product_name, change.old_quantity, value
            )),
            ItemChangeKind::Increased | ItemChangeKind::Decreased => changed.push(format!(
                "{} {} -> {} ({:+.2})",
                change.product_name, change.old_quantity, change.new_quantity, value
            )),
        }
    }

    let mut parts = Vec::new();
    if !added.is_empty() {
        parts.push(format!("added {}", added.join(", ")));
    }
    if !removed.is_empty() {
        parts.push(format!("removed {}", removed.join(", ")));
    }
    if !changed.is_empty() {
        parts.push(format!("changed {}", changed.join(", ")));
    }

    let mut note = format!("Order #{} items updated", short_id(order_id));
    if !parts.is_empty() {
        let _ = write!(note, ": {}", parts.join("; "));
    }
    let direction = if net_change > Decimal::ZERO {
        "increased"
    } else {
        "decreased"
    };
    let _ = write!(
        note,
        ". Debt {} by {:.2} {}",
        direction,
        net_change.abs(),
        currency
    );
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CategoryCurrencyPolicy;
    use crate::order::types::{OrderLine, ProductCatalog, ProductSnapshot};
    use kasa_shared::types::ProductId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_short_id_is_eight_hex_chars() {
        let short = short_id(OrderId::new());
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_creation_note() {
        let id = OrderId::new();
        let note = creation_note(id, Currency::Eur, dec!(100));
        assert_eq!(
            note,
            format!("Order #{} created: debt increased by 100.00 EUR", short_id(id))
        );
    }

    #[test]
    fn test_edit_note_lists_changes_and_net() {
        let snapshot = |name: &str, price| ProductSnapshot {
            id: ProductId::new(),
            name: name.into(),
            category: "accessories".into(),
            price,
            stock_quantity: 10,
            enabled: true,
        };
        let charger = snapshot("Charger", dec!(10));
        let case = snapshot("Case", dec!(5));
        let catalog: ProductCatalog = [charger.clone(), case.clone()].into_iter().collect();
        let old = vec![
            OrderLine { product_id: charger.id, quantity: 2, price: dec!(10) },
            OrderLine { product_id: case.id, quantity: 1, price: dec!(5) },
        ];
        let new = vec![OrderLine { product_id: charger.id, quantity: 3, price: dec!(10) }];
        let diff = ItemDiff::compute(&old, &new, &catalog, &CategoryCurrencyPolicy::default()).unwrap();

        let id = OrderId::new();
        let note = edit_note(id, &diff, Currency::Mkd, dec!(5));

        assert!(note.starts_with(&format!("Order #{} items updated: ", short_id(id))));
        assert!(note.contains("removed Case x1 (-5.00)"));
        assert!(note.contains("changed Charger 2 -> 3 (+10.00)"));
        assert!(note.ends_with("Debt increased by 5.00 MKD"));
    }
}
