//! Order error types.

use rust_decimal::Decimal;
use thiserror::Error;

use kasa_shared::types::{OrderId, ProductId};

/// Errors raised while planning order mutations.
#[derive(Debug, Error)]
pub enum OrderError {
    // ========== Validation Errors ==========
    /// Order has no items.
    #[error("Order must have at least one item")]
    EmptyOrder,

    /// Quantity must be strictly positive.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        /// Product ID.
        product_id: ProductId,
        /// Requested quantity.
        quantity: i32,
    },

    /// Unit price must not be negative.
    #[error("Invalid price {price} for product {product_id}")]
    InvalidPrice {
        /// Product ID.
        product_id: ProductId,
        /// Requested price.
        price: Decimal,
    },

    /// A line or order total is beyond the supported amount range.
    #[error("Order amount exceeds the supported maximum of {max}")]
    AmountOutOfRange {
        /// Largest accepted amount.
        max: Decimal,
    },

    /// Discount is negative or larger than the order total.
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),

    /// Status is not accepted by the mutation path.
    #[error("Unsupported order status '{0}'")]
    UnsupportedStatus(String),

    /// Status change other than pending -> completed.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Guest orders need a name.
    #[error("Guest name is required for guest orders")]
    MissingGuestName,

    // ========== Inventory Errors ==========
    /// Product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Product is disabled for sale.
    #[error("Product '{name}' is disabled")]
    ProductDisabled {
        /// Product ID.
        product_id: ProductId,
        /// Product name.
        name: String,
    },

    /// Not enough units on hand.
    #[error("Insufficient stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        /// Product ID.
        product_id: ProductId,
        /// Product name.
        name: String,
        /// Units requested.
        requested: i32,
        /// Units available.
        available: i32,
    },

    // ========== Lookup Errors ==========
    /// Order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

impl OrderError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::InvalidPrice { .. } => "INVALID_PRICE",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::InvalidDiscount(_) => "INVALID_DISCOUNT",
            Self::UnsupportedStatus(_) => "UNSUPPORTED_STATUS",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::MissingGuestName => "MISSING_GUEST_NAME",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ProductDisabled { .. } => "PRODUCT_DISABLED",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::EmptyOrder
            | Self::InvalidQuantity { .. }
            | Self::InvalidPrice { .. }
            | Self::AmountOutOfRange { .. }
            | Self::InvalidDiscount(_)
            | Self::UnsupportedStatus(_)
            | Self::MissingGuestName => 400,
            Self::ProductNotFound(_) | Self::OrderNotFound(_) => 404,
            Self::InvalidStatusTransition { .. }
            | Self::ProductDisabled { .. }
            | Self::InsufficientStock { .. } => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_errors_are_business_rules() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new(),
            name: "Phone".into(),
            requested: 3,
            available: 1,
        };
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "INSUFFICIENT_STOCK");
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 'Phone': requested 3, available 1"
        );
    }

    #[test]
    fn test_lookup_errors_are_not_found() {
        assert_eq!(OrderError::OrderNotFound(OrderId::new()).http_status_code(), 404);
        assert_eq!(OrderError::EmptyOrder.http_status_code(), 400);
    }

    #[test]
    fn test_out_of_range_is_client_error() {
        let err = OrderError::AmountOutOfRange {
            max: kasa_shared::types::MAX_AMOUNT,
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
    }
}
