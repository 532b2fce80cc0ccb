//! Dashboard summary.
//!
//! Combines revenue from completed orders with debt from the ledger. The two
//! figures are tracked independently: revenue never reads the ledger.

mod revenue;

pub use revenue::RevenueCalculator;

use serde::Serialize;

use kasa_shared::types::ProductId;

use crate::currency::CurrencyTotals;

/// Order counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderCounts {
    /// Pending orders.
    pub pending: u64,
    /// Completed orders.
    pub completed: u64,
    /// All orders.
    pub total: u64,
}

/// A product at or below the low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockProduct {
    /// Product ID.
    pub id: ProductId,
    /// Name.
    pub name: String,
    /// Units on hand.
    pub stock_quantity: i32,
}

/// Admin dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Revenue per currency from completed orders, after discounts.
    pub revenue: CurrencyTotals,
    /// Outstanding debt per currency across all clients.
    pub debt: CurrencyTotals,
    /// Orders by status.
    pub orders: OrderCounts,
    /// Registered clients.
    pub client_count: u64,
    /// Threshold used for `low_stock`.
    pub low_stock_threshold: i32,
    /// Products at or below the threshold, lowest first.
    pub low_stock: Vec<LowStockProduct>,
}
