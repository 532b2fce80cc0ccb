//! Revenue from completed orders.

use crate::currency::{CurrencyPolicy, CurrencyTotals};
use crate::order::{OrderError, OrderService, OrderState, OrderStatus, ProductCatalog};

/// Sums completed-order totals per settlement currency.
pub struct RevenueCalculator<'p> {
    service: OrderService<'p>,
}

impl<'p> RevenueCalculator<'p> {
    /// Creates a calculator routing lines through `policy`.
    #[must_use]
    pub fn new(policy: &'p dyn CurrencyPolicy) -> Self {
        Self {
            service: OrderService::new(policy),
        }
    }

    /// Revenue of the completed orders among `orders`, net of discounts.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::ProductNotFound` if a line's product is missing
    /// from the catalog.
    pub fn revenue<'a, I>(&self, orders: I, catalog: &ProductCatalog) -> Result<CurrencyTotals, OrderError>
    where
        I: IntoIterator<Item = &'a OrderState>,
    {
        let mut revenue = CurrencyTotals::new();
        for order in orders.into_iter().filter(|o| o.status == OrderStatus::Completed) {
            let totals = self
                .service
                .settlement_totals(&order.lines, catalog, order.totals.discount)?;
            for (currency, amount) in totals.non_zero() {
                revenue.add(currency, amount);
            }
        }
        Ok(revenue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CategoryCurrencyPolicy;
    use crate::order::{Discount, GuestContact, OrderLine, OrderParty, OrderTotals, ProductSnapshot};
    use kasa_shared::types::{Currency, OrderId, ProductId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus, lines: Vec<OrderLine>, discount: Option<Discount>) -> OrderState {
        OrderState {
            id: OrderId::new(),
            party: OrderParty::Guest(GuestContact {
                name: "Walk-in".into(),
                email: None,
                phone: None,
            }),
            status,
            lines,
            totals: OrderTotals {
                original_total: Decimal::ZERO,
                total_amount: Decimal::ZERO,
                discount,
            },
        }
    }

    #[test]
    fn test_only_completed_orders_count() {
        let phone = ProductSnapshot {
            id: ProductId::new(),
            name: "Phone".into(),
            category: "Smartphones".into(),
            price: dec!(200),
            stock_quantity: 1,
            enabled: true,
        };
        let cable = ProductSnapshot {
            id: ProductId::new(),
            name: "Cable".into(),
            category: "accessories".into(),
            price: dec!(150),
            stock_quantity: 1,
            enabled: true,
        };
        let catalog: ProductCatalog = [phone.clone(), cable.clone()].into_iter().collect();
        let phone_line = OrderLine { product_id: phone.id, quantity: 1, price: dec!(200) };
        let cable_line = OrderLine { product_id: cable.id, quantity: 2, price: dec!(150) };

        let orders = vec![
            order(
                OrderStatus::Completed,
                vec![phone_line.clone(), cable_line.clone()],
                Some(Discount { amount: dec!(20), currency: Currency::Eur }),
            ),
            order(OrderStatus::Pending, vec![phone_line], None),
            order(OrderStatus::Completed, vec![cable_line], None),
        ];

        let policy = CategoryCurrencyPolicy::default();
        let revenue = RevenueCalculator::new(&policy).revenue(&orders, &catalog).unwrap();

        assert_eq!(revenue.get(Currency::Eur), dec!(180));
        assert_eq!(revenue.get(Currency::Mkd), dec!(600));
    }
}
