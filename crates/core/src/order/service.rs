//! Order mutation planning.
//!
//! `OrderService` turns a request plus the locked order and product rows into
//! a plan: the lines to store, stock movements, ledger entries to append and
//! recomputed totals. The database layer applies a plan in one transaction.

use rust_decimal::Decimal;

use kasa_shared::types::{MAX_AMOUNT, MONEY_SCALE, OrderId, UserId, fits_money_column};

use super::diff::ItemDiff;
use super::error::OrderError;
use super::notes;
use super::stock::{StockPlan, StockReconciler};
use super::types::{
    Discount, OrderItemInput, OrderLine, OrderParty, OrderState, OrderStatus, OrderTotals,
    ProductCatalog,
};
use crate::currency::{CurrencyPolicy, CurrencyTotals};
use crate::ledger::{LedgerEntryKind, NewLedgerEntry};

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    /// Pre-generated order ID, referenced by ledger entries.
    pub order_id: OrderId,
    /// Owner.
    pub party: OrderParty,
    /// Initial status, `pending` or `completed`.
    pub status: OrderStatus,
    /// Requested lines.
    pub items: Vec<OrderItemInput>,
    /// Optional flat discount.
    pub discount: Option<Discount>,
    /// Acting user.
    pub created_by: UserId,
}

/// Everything needed to persist a new order.
#[derive(Debug, Clone)]
pub struct CreationPlan {
    /// Lines to insert, one per product.
    pub lines: Vec<OrderLine>,
    /// Order totals.
    pub totals: OrderTotals,
    /// Stock deductions.
    pub stock: StockPlan,
    /// Debt entries to append (empty for guests and completed orders).
    pub ledger_entries: Vec<NewLedgerEntry>,
}

/// Requested changes to an existing order.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    /// Replacement item set, if items are being edited.
    pub items: Option<Vec<OrderItemInput>>,
    /// New status, if the status is being changed.
    pub status: Option<OrderStatus>,
    /// Keep the stored discount when items change; otherwise it is cleared.
    pub preserve_discount: bool,
    /// Acting user.
    pub actor: UserId,
}

/// An item replacement that actually changes quantities.
#[derive(Debug, Clone)]
pub struct ItemReplacement {
    /// New lines, one per product.
    pub lines: Vec<OrderLine>,
    /// Recomputed totals.
    pub totals: OrderTotals,
    /// Restore-then-deduct movements.
    pub stock: StockPlan,
    /// Net debt entries, at most one per currency.
    pub ledger_entries: Vec<NewLedgerEntry>,
    /// Classified changes.
    pub diff: ItemDiff,
}

/// Planned changes for an order update.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    /// Status to store, when it differs from the current one.
    pub status: Option<OrderStatus>,
    /// Item replacement, when quantities differ.
    pub items: Option<ItemReplacement>,
}

impl UpdatePlan {
    /// Returns true if nothing needs to be written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.status.is_none() && self.items.is_none()
    }
}

/// Planned changes for deleting an order.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    /// Stock restored for every line.
    pub stock: StockPlan,
}

/// Plans order creation, edits and deletion.
#[derive(Debug, Clone, Copy)]
pub struct OrderService<'p> {
    policy: &'p dyn CurrencyPolicy,
}

impl<'p> OrderService<'p> {
    /// Creates a service routing currencies through `policy`.
    #[must_use]
    pub fn new(policy: &'p dyn CurrencyPolicy) -> Self {
        Self { policy }
    }

    /// Plans a new order.
    ///
    /// Debt entries (one `order_debit` per currency with a non-zero total
    /// after discount) are planned only for `pending` orders of registered
    /// clients.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` for invalid input or insufficient stock.
    pub fn plan_creation(
        &self,
        input: &CreateOrderInput,
        catalog: &ProductCatalog,
    ) -> Result<CreationPlan, OrderError> {
        if !input.status.is_supported() {
            return Err(OrderError::UnsupportedStatus(input.status.as_str().to_string()));
        }
        if let OrderParty::Guest(guest) = &input.party {
            if guest.name.trim().is_empty() {
                return Err(OrderError::MissingGuestName);
            }
        }

        let lines = Self::resolve_lines(&input.items, &[], catalog)?;
        let totals = Self::compute_totals(&lines, input.discount)?;
        let stock = StockReconciler::plan_allocation(&lines, catalog)?;

        let mut ledger_entries = Vec::new();
        if let (Some(client_id), OrderStatus::Pending) = (input.party.client_id(), input.status) {
            let owed = self.settlement_totals(&lines, catalog, totals.discount)?;
            for (currency, amount) in owed.non_zero() {
                ledger_entries.push(NewLedgerEntry {
                    client_id,
                    currency,
                    amount: -amount,
                    kind: LedgerEntryKind::OrderDebit,
                    notes: notes::creation_note(input.order_id, currency, amount),
                    order_id: Some(input.order_id),
                    created_by: Some(input.created_by),
                });
            }
        }

        Ok(CreationPlan {
            lines,
            totals,
            stock,
            ledger_entries,
        })
    }

    /// Plans an update of status and/or items.
    ///
    /// Status and items are independent. An item set whose merged quantities
    /// equal the stored ones plans no stock or ledger writes.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` for rejected status changes, invalid items or
    /// insufficient stock.
    pub fn plan_update(
        &self,
        current: &OrderState,
        update: &OrderUpdate,
        catalog: &ProductCatalog,
    ) -> Result<UpdatePlan, OrderError> {
        let status = match update.status {
            Some(next) => current.status.transition_to(next)?.then_some(next),
            None => None,
        };

        let items = match &update.items {
            Some(requested) => self.plan_item_replacement(current, requested, update, catalog)?,
            None => None,
        };

        Ok(UpdatePlan { status, items })
    }

    fn plan_item_replacement(
        &self,
        current: &OrderState,
        requested: &[OrderItemInput],
        update: &OrderUpdate,
        catalog: &ProductCatalog,
    ) -> Result<Option<ItemReplacement>, OrderError> {
        let lines = Self::resolve_lines(requested, &current.lines, catalog)?;
        if ItemDiff::same_quantities(&current.lines, &lines) {
            return Ok(None);
        }

        let stock = StockReconciler::plan_replacement(&current.lines, &lines, catalog)?;
        let diff = ItemDiff::compute(&current.lines, &lines, catalog, self.policy)?;

        let mut ledger_entries = Vec::new();
        if let Some(client_id) = current.party.client_id() {
            for (currency, net_change) in diff.net_change().non_zero() {
                let amount = -net_change;
                ledger_entries.push(NewLedgerEntry {
                    client_id,
                    currency,
                    amount,
                    kind: LedgerEntryKind::for_order_amount(amount),
                    notes: notes::edit_note(current.id, &diff, currency, net_change),
                    order_id: Some(current.id),
                    created_by: Some(update.actor),
                });
            }
        }

        let discount = if update.preserve_discount {
            current.totals.discount
        } else {
            None
        };
        let totals = Self::compute_totals(&lines, discount)?;

        Ok(Some(ItemReplacement {
            lines,
            totals,
            stock,
            ledger_entries,
            diff,
        }))
    }

    /// Plans deletion: every line's stock is given back. No ledger entry is written.
    #[must_use]
    pub fn plan_deletion(current: &OrderState) -> DeletionPlan {
        DeletionPlan {
            stock: StockReconciler::plan_release(&current.lines),
        }
    }

    /// Validates requested items and merges duplicate products.
    ///
    /// Prices: an explicit request price wins, then the price already stored
    /// for that product on this order, then the current list price.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` for an empty request, non-positive or
    /// overflowing quantities, negative or unstorable prices, line totals
    /// beyond `MAX_AMOUNT`, or unknown products.
    pub fn resolve_lines(
        items: &[OrderItemInput],
        existing: &[OrderLine],
        catalog: &ProductCatalog,
    ) -> Result<Vec<OrderLine>, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut lines: Vec<OrderLine> = Vec::with_capacity(items.len());
        let mut explicit: Vec<bool> = Vec::with_capacity(items.len());

        for item in items {
            if item.quantity <= 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
            if let Some(price) = item.price {
                if price < Decimal::ZERO || !fits_money_column(price) {
                    return Err(OrderError::InvalidPrice {
                        product_id: item.product_id,
                        price,
                    });
                }
            }
            let product = catalog.get(item.product_id)?;

            if let Some(pos) = lines.iter().position(|l| l.product_id == item.product_id) {
                lines[pos].quantity = lines[pos]
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(OrderError::InvalidQuantity {
                        product_id: item.product_id,
                        quantity: i32::MAX,
                    })?;
                if let (Some(price), false) = (item.price, explicit[pos]) {
                    lines[pos].price = price;
                    explicit[pos] = true;
                }
                continue;
            }

            let price = item
                .price
                .or_else(|| {
                    existing
                        .iter()
                        .find(|l| l.product_id == item.product_id)
                        .map(|l| l.price)
                })
                .unwrap_or(product.price);
            lines.push(OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                price,
            });
            explicit.push(item.price.is_some());
        }

        if lines
            .iter()
            .any(|l| l.checked_line_total().is_none_or(|t| t > MAX_AMOUNT))
        {
            return Err(OrderError::AmountOutOfRange { max: MAX_AMOUNT });
        }

        Ok(lines)
    }

    /// Sums line totals and applies a discount.
    ///
    /// A zero discount is dropped.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::AmountOutOfRange` when the total passes
    /// `MAX_AMOUNT`, and `OrderError::InvalidDiscount` for a negative,
    /// over-precise or oversized discount.
    pub fn compute_totals(
        lines: &[OrderLine],
        discount: Option<Discount>,
    ) -> Result<OrderTotals, OrderError> {
        let out_of_range = || OrderError::AmountOutOfRange { max: MAX_AMOUNT };
        let mut original_total = Decimal::ZERO;
        for line in lines {
            original_total = line
                .checked_line_total()
                .and_then(|t| original_total.checked_add(t))
                .filter(|t| *t <= MAX_AMOUNT)
                .ok_or_else(out_of_range)?;
        }

        let discount = discount.filter(|d| !d.amount.is_zero());
        if let Some(d) = discount {
            if d.amount < Decimal::ZERO {
                return Err(OrderError::InvalidDiscount(format!(
                    "discount {} cannot be negative",
                    d.amount
                )));
            }
            if !fits_money_column(d.amount) {
                return Err(OrderError::InvalidDiscount(format!(
                    "discount {} has more than {MONEY_SCALE} decimal places",
                    d.amount
                )));
            }
            if d.amount > original_total {
                return Err(OrderError::InvalidDiscount(format!(
                    "discount {} exceeds order total {original_total}",
                    d.amount
                )));
            }
        }

        Ok(OrderTotals {
            original_total,
            total_amount: original_total - discount.map_or(Decimal::ZERO, |d| d.amount),
            discount,
        })
    }

    /// Line totals routed to their settlement currency, less the discount in
    /// its own currency. A currency never goes below zero.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ProductNotFound` if a line's product is missing
    /// from the catalog.
    pub fn settlement_totals(
        &self,
        lines: &[OrderLine],
        catalog: &ProductCatalog,
        discount: Option<Discount>,
    ) -> Result<CurrencyTotals, OrderError> {
        let mut totals = CurrencyTotals::new();
        for line in lines {
            let product = catalog.get(line.product_id)?;
            totals.add(
                self.policy.currency_for_category(&product.category),
                line.line_total(),
            );
        }

        if let Some(d) = discount {
            let taken = d.amount.min(totals.get(d.currency)).max(Decimal::ZERO);
            totals.add(d.currency, -taken);
        }
        Ok(totals)
    }
}
