//! Order lifecycle and reconciliation.
//!
//! This module plans every side effect of creating, editing and deleting an
//! order:
//! - Validation of items, discounts and status transitions
//! - Stock deduction and restoration ([`StockReconciler`])
//! - Net-change diffing of item edits ([`ItemDiff`])
//! - Debt ledger entries for registered clients
//!
//! Plans are pure data. Persistence applies them atomically.

pub mod diff;
pub mod error;
pub mod notes;
pub mod service;
pub mod stock;
pub mod types;

#[cfg(test)]
mod reconcile_props;

pub use diff::{ItemChange, ItemChangeKind, ItemDiff};
pub use error::OrderError;
pub use service::{
    CreateOrderInput, CreationPlan, DeletionPlan, ItemReplacement, OrderService, OrderUpdate,
    UpdatePlan,
};
pub use stock::{StockMovement, StockPlan, StockReconciler};
pub use types::{
    Discount, GuestContact, OrderItemInput, OrderLine, OrderParty, OrderState, OrderStatus,
    OrderTotals, ProductCatalog, ProductSnapshot,
};
