//! Item-set diffing for order edits.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use kasa_shared::types::{Currency, ProductId};

use super::error::OrderError;
use super::types::{OrderLine, ProductCatalog};
use crate::currency::{CurrencyPolicy, CurrencyTotals};

/// How one product's quantity changed between two item sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemChangeKind {
    /// Product is new to the order.
    Added,
    /// Product left the order.
    Removed,
    /// Quantity went up.
    Increased,
    /// Quantity went down.
    Decreased,
}

/// One product's change, priced and routed to a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemChange {
    /// Product ID.
    pub product_id: ProductId,
    /// Product name, for notes.
    pub product_name: String,
    /// Settlement currency from the policy.
    pub currency: Currency,
    /// Classification.
    pub kind: ItemChangeKind,
    /// Quantity in the old set (0 when added).
    pub old_quantity: i32,
    /// Quantity in the new set (0 when removed).
    pub new_quantity: i32,
    /// Unit price: the new line's for added or changed products, the old line's for removed ones.
    pub price: Decimal,
}

impl ItemChange {
    /// Signed quantity change.
    #[must_use]
    pub fn quantity_delta(&self) -> i32 {
        self.new_quantity.saturating_sub(self.old_quantity)
    }

    /// Signed value change: positive raises what the client owes.
    #[must_use]
    pub fn value(&self) -> Decimal {
        Decimal::from(self.quantity_delta()).saturating_mul(self.price)
    }
}

/// Differences between an order's stored and requested item sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemDiff {
    changes: Vec<ItemChange>,
}

impl ItemDiff {
    /// Builds the `product -> quantity` map of a line set, summing duplicates.
    #[must_use]
    pub fn quantities(lines: &[OrderLine]) -> BTreeMap<ProductId, i32> {
        let mut map = BTreeMap::new();
        for line in lines {
            let total = map.entry(line.product_id).or_insert(0_i32);
            *total = total.saturating_add(line.quantity);
        }
        map
    }

    /// Returns true when both sets hold the same quantity of every product.
    #[must_use]
    pub fn same_quantities(old: &[OrderLine], new: &[OrderLine]) -> bool {
        Self::quantities(old) == Self::quantities(new)
    }

    /// Classifies every product whose quantity differs between `old` and `new`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ProductNotFound` if a product is missing from the catalog.
    pub fn compute(
        old: &[OrderLine],
        new: &[OrderLine],
        catalog: &ProductCatalog,
        policy: &dyn CurrencyPolicy,
    ) -> Result<Self, OrderError> {
        let old_qty = Self::quantities(old);
        let new_qty = Self::quantities(new);
        let old_price = prices(old);
        let new_price = prices(new);

        let mut products: Vec<ProductId> = old_qty.keys().chain(new_qty.keys()).copied().collect();
        products.sort_unstable();
        products.dedup();

        let mut changes = Vec::new();
        for product_id in products {
            let before = old_qty.get(&product_id).copied().unwrap_or(0);
            let after = new_qty.get(&product_id).copied().unwrap_or(0);
            let kind = match (before, after) {
                (b, a) if b == a => continue,
                (0, _) => ItemChangeKind::Added,
                (_, 0) => ItemChangeKind::Removed,
                (b, a) if a > b => ItemChangeKind::Increased,
                _ => ItemChangeKind::Decreased,
            };
            let price = if kind == ItemChangeKind::Removed {
                old_price.get(&product_id)
            } else {
                new_price.get(&product_id)
            }
            .copied()
            .unwrap_or(Decimal::ZERO);

            let product = catalog.get(product_id)?;
            changes.push(ItemChange {
                product_id,
                product_name: product.name.clone(),
                currency: policy.currency_for_category(&product.category),
                kind,
                old_quantity: before,
                new_quantity: after,
                price,
            });
        }

        Ok(Self { changes })
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The individual changes, ordered by product id.
    #[must_use]
    pub fn changes(&self) -> &[ItemChange] {
        &self.changes
    }

    /// Changes settled in `currency`.
    pub fn changes_in(&self, currency: Currency) -> impl Iterator<Item = &ItemChange> {
        self.changes.iter().filter(move |c| c.currency == currency)
    }

    /// Net value change per currency. Positive means more debt.
    #[must_use]
    pub fn net_change(&self) -> CurrencyTotals {
        self.changes.iter().map(|c| (c.currency, c.value())).collect()
    }
}

fn prices(lines: &[OrderLine]) -> BTreeMap<ProductId, Decimal> {
    let mut map = BTreeMap::new();
    for line in lines {
        map.entry(line.product_id).or_insert(line.price);
    }
    map
}
