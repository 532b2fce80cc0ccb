//! Invoice data assembly.
//!
//! Produces the data an invoice renderer needs. Layout is the renderer's job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use kasa_shared::types::{Currency, OrderId, ProductId};

use crate::currency::{CurrencyPolicy, CurrencyTotals};
use crate::ledger::ClientBalance;
use crate::order::{
    notes, Discount, OrderError, OrderService, OrderState, OrderStatus, ProductCatalog,
};

/// Bill-to details, either a client's profile or a guest's contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceCustomer {
    /// Customer name.
    pub name: String,
    /// Company, for registered clients.
    pub company: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Phone.
    pub phone: Option<String>,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    /// Product ID.
    pub product_id: ProductId,
    /// Product name.
    pub name: String,
    /// Settlement currency of the line.
    pub currency: Currency,
    /// Units.
    pub quantity: i32,
    /// Unit price snapshotted on the order.
    pub unit_price: Decimal,
    /// Quantity times unit price.
    pub line_total: Decimal,
}

/// Everything an invoice shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDocument {
    /// Order ID.
    pub order_id: OrderId,
    /// Short invoice number.
    pub number: String,
    /// Render time.
    pub issued_at: DateTime<Utc>,
    /// Order status.
    pub status: OrderStatus,
    /// Bill-to details.
    pub customer: InvoiceCustomer,
    /// Lines in stored order.
    pub lines: Vec<InvoiceLine>,
    /// Line totals per currency before discount.
    pub subtotals: CurrencyTotals,
    /// Applied discount.
    pub discount: Option<Discount>,
    /// Amount due per currency after discount.
    pub totals: CurrencyTotals,
    /// Client's current debt per currency. `None` for guest orders.
    pub client_debt: Option<CurrencyTotals>,
}

/// Builds [`InvoiceDocument`]s.
pub struct InvoiceBuilder<'p> {
    policy: &'p dyn CurrencyPolicy,
}

impl<'p> InvoiceBuilder<'p> {
    /// Creates a builder routing lines through `policy`.
    #[must_use]
    pub fn new(policy: &'p dyn CurrencyPolicy) -> Self {
        Self { policy }
    }

    /// Assembles the invoice for `order`.
    ///
    /// `balance` is the client's balance derived at render time.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ProductNotFound` if a line's product is missing
    /// from the catalog.
    pub fn build(
        &self,
        order: &OrderState,
        catalog: &ProductCatalog,
        customer: InvoiceCustomer,
        balance: Option<&ClientBalance>,
        issued_at: DateTime<Utc>,
    ) -> Result<InvoiceDocument, OrderError> {
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = catalog.get(line.product_id)?;
            lines.push(InvoiceLine {
                product_id: line.product_id,
                name: product.name.clone(),
                currency: self.policy.currency_for_category(&product.category),
                quantity: line.quantity,
                unit_price: line.price,
                line_total: line.line_total(),
            });
        }

        let subtotals = lines.iter().map(|l| (l.currency, l.line_total)).collect();
        let totals = OrderService::new(self.policy).settlement_totals(
            &order.lines,
            catalog,
            order.totals.discount,
        )?;

        Ok(InvoiceDocument {
            order_id: order.id,
            number: notes::short_id(order.id).to_uppercase(),
            issued_at,
            status: order.status,
            customer,
            lines,
            subtotals,
            discount: order.totals.discount,
            totals,
            client_debt: balance.map(|b| b.debt.clone()),
        })
    }
}
