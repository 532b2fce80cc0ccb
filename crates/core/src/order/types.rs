//! Order domain types.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kasa_shared::types::{Currency, OrderId, ProductId, UserId};

use super::error::OrderError;

/// Order lifecycle status.
///
/// Only `Pending` and `Completed` are reachable. The other variants exist so
/// stored rows always deserialize, but every mutation path rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Open order; contributes debt for registered clients.
    Pending,
    /// Legacy state, not reachable.
    Approved,
    /// Legacy state, not reachable.
    Shipped,
    /// Settled order; contributes revenue.
    Completed,
    /// Legacy state, not reachable.
    Cancelled,
}

impl OrderStatus {
    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true for statuses an order may be created with or moved to.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Pending | Self::Completed)
    }

    /// Validates a status change.
    ///
    /// Returns `Ok(false)` when `next` equals the current status (no-op) and
    /// `Ok(true)` for the single allowed transition `pending -> completed`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnsupportedStatus` for dead statuses and
    /// `OrderError::InvalidStatusTransition` for any other change.
    pub fn transition_to(self, next: Self) -> Result<bool, OrderError> {
        if !next.is_supported() {
            return Err(OrderError::UnsupportedStatus(next.as_str().to_string()));
        }
        if self == next {
            return Ok(false);
        }
        match (self, next) {
            (Self::Pending, Self::Completed) => Ok(true),
            (from, to) => Err(OrderError::InvalidStatusTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnsupportedStatus(other.to_string())),
        }
    }
}

/// Product fields the reconcilers need, as read inside the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Category, routed to a currency by the policy.
    pub category: String,
    /// Current list price.
    pub price: Decimal,
    /// Units on hand.
    pub stock_quantity: i32,
    /// False when the product is disabled for sale.
    pub enabled: bool,
}

/// Products keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog(HashMap<ProductId, ProductSnapshot>);

impl ProductCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn insert(&mut self, product: ProductSnapshot) {
        self.0.insert(product.id, product);
    }

    /// Looks up a product.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ProductNotFound` if the product is unknown.
    pub fn get(&self, id: ProductId) -> Result<&ProductSnapshot, OrderError> {
        self.0.get(&id).ok_or(OrderError::ProductNotFound(id))
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ProductSnapshot> for ProductCatalog {
    fn from_iter<T: IntoIterator<Item = ProductSnapshot>>(iter: T) -> Self {
        Self(iter.into_iter().map(|p| (p.id, p)).collect())
    }
}

/// A stored order line with its snapshotted price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product ID.
    pub product_id: ProductId,
    /// Units ordered, always positive.
    pub quantity: i32,
    /// Unit price at the time the line was written.
    pub price: Decimal,
}

impl OrderLine {
    /// Quantity times unit price, or `None` on overflow.
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.price)
    }

    /// Quantity times unit price.
    ///
    /// Saturates instead of overflowing. Lines accepted by
    /// `OrderService::resolve_lines` stay within `MAX_AMOUNT`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity).saturating_mul(self.price)
    }
}

/// A requested order line. A missing price falls back to the stored or list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemInput {
    /// Product ID.
    pub product_id: ProductId,
    /// Units requested.
    pub quantity: i32,
    /// Explicit unit price.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// A flat discount in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Discount amount, never negative.
    pub amount: Decimal,
    /// Currency the discount is taken from.
    pub currency: Currency,
}

/// Contact details of a walk-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    /// Name, required.
    pub name: String,
    /// Email, optional.
    pub email: Option<String>,
    /// Phone, optional.
    pub phone: Option<String>,
}

/// Who an order belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderParty {
    /// A registered client with a debt ledger.
    Client {
        /// Client user ID.
        client_id: UserId,
    },
    /// A guest without a ledger.
    Guest(GuestContact),
}

impl OrderParty {
    /// Returns the client id for registered-client orders.
    #[must_use]
    pub const fn client_id(&self) -> Option<UserId> {
        match self {
            Self::Client { client_id } => Some(*client_id),
            Self::Guest(_) => None,
        }
    }
}

/// Monetary totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of line totals before discount.
    pub original_total: Decimal,
    /// Total after discount.
    pub total_amount: Decimal,
    /// Applied discount, if any.
    pub discount: Option<Discount>,
}

/// The persisted state of an order, as loaded under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
    /// Order ID.
    pub id: OrderId,
    /// Owner.
    pub party: OrderParty,
    /// Current status.
    pub status: OrderStatus,
    /// Stored lines.
    pub lines: Vec<OrderLine>,
    /// Stored totals.
    pub totals: OrderTotals,
}
