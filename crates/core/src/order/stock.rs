//! Stock reconciliation plans.
//!
//! The reconciler never touches storage. It validates requested quantities
//! against a catalog read under lock and returns the movements the caller
//! must apply inside the same transaction.

use std::collections::BTreeMap;

use serde::Serialize;

use kasa_shared::types::ProductId;

use super::diff::ItemDiff;
use super::error::OrderError;
use super::types::{OrderLine, ProductCatalog};

/// A signed change to one product's stock: positive restores, negative deducts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    /// Product ID.
    pub product_id: ProductId,
    /// Signed unit change.
    pub delta: i32,
}

/// Ordered stock movements for one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockPlan {
    movements: Vec<StockMovement>,
}

impl StockPlan {
    /// The movements in application order.
    #[must_use]
    pub fn movements(&self) -> &[StockMovement] {
        &self.movements
    }

    /// Returns true if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Net change per product, dropping products that net to zero.
    #[must_use]
    pub fn net_by_product(&self) -> BTreeMap<ProductId, i32> {
        let mut net = BTreeMap::new();
        for movement in &self.movements {
            *net.entry(movement.product_id).or_insert(0) += movement.delta;
        }
        net.retain(|_, delta| *delta != 0);
        net
    }

    fn push(&mut self, product_id: ProductId, delta: i32) {
        self.movements.push(StockMovement { product_id, delta });
    }
}

/// Plans stock movements for order creation, edits and deletion.
pub struct StockReconciler;

impl StockReconciler {
    /// Deducts stock for a new order.
    ///
    /// # Errors
    ///
    /// Fails the whole plan if any product is unknown or disabled, a quantity
    /// is not positive, or a product lacks stock.
    pub fn plan_allocation(
        lines: &[OrderLine],
        catalog: &ProductCatalog,
    ) -> Result<StockPlan, OrderError> {
        Self::plan_replacement(&[], lines, catalog)
    }

    /// Restores every stored line, then deducts every requested line.
    ///
    /// Availability is checked against stock plus what this order gives back.
    /// Only products new to the order must be enabled, so an order can keep a
    /// product that was disabled after it was sold.
    ///
    /// # Errors
    ///
    /// Same as [`Self::plan_allocation`].
    pub fn plan_replacement(
        old: &[OrderLine],
        new: &[OrderLine],
        catalog: &ProductCatalog,
    ) -> Result<StockPlan, OrderError> {
        if let Some(line) = new.iter().find(|l| l.quantity <= 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }

        let restored = ItemDiff::quantities(old);
        let requested = ItemDiff::quantities(new);

        for (product_id, quantity) in &requested {
            let product = catalog.get(*product_id)?;
            let given_back = restored.get(product_id).copied().unwrap_or(0);

            if given_back == 0 && !product.enabled {
                return Err(OrderError::ProductDisabled {
                    product_id: *product_id,
                    name: product.name.clone(),
                });
            }

            let available = product.stock_quantity.saturating_add(given_back);
            if *quantity > available {
                return Err(OrderError::InsufficientStock {
                    product_id: *product_id,
                    name: product.name.clone(),
                    requested: *quantity,
                    available,
                });
            }
        }

        let mut plan = StockPlan::default();
        for line in old {
            plan.push(line.product_id, line.quantity);
        }
        for line in new {
            plan.push(line.product_id, -line.quantity);
        }
        Ok(plan)
    }

    /// Gives back the stock of every line of a deleted order.
    #[must_use]
    pub fn plan_release(lines: &[OrderLine]) -> StockPlan {
        let mut plan = StockPlan::default();
        for line in lines {
            plan.push(line.product_id, line.quantity);
        }
        plan
    }
}
