//! Property-based tests for order reconciliation.
//!
//! - Idempotence: re-submitting the stored item set plans no writes
//! - Stock conservation across create/edit/delete sequences
//! - Debt tracks the settlement totals of live pending client orders

use proptest::prelude::*;
use rust_decimal::Decimal;

use kasa_shared::types::{Currency, OrderId, ProductId, UserId};

use super::service::{CreateOrderInput, OrderService, OrderUpdate};
use super::stock::StockPlan;
use super::types::{
    OrderItemInput, OrderParty, OrderState, OrderStatus, ProductCatalog, ProductSnapshot,
};
use crate::currency::{CategoryCurrencyPolicy, CurrencyTotals};
use crate::ledger::NewLedgerEntry;

const INITIAL_STOCK: i32 = 40;

#[derive(Debug, Clone)]
enum Op {
    Create(Vec<(usize, i32)>),
    Edit(usize, Vec<(usize, i32)>),
    Delete(usize),
}

fn items_strategy() -> impl Strategy<Value = Vec<(usize, i32)>> {
    prop::collection::vec((0usize..4, 1i32..6), 1..5)
}

fn op_strategy(with_delete: bool) -> BoxedStrategy<Op> {
    let create = items_strategy().prop_map(Op::Create);
    let edit = (0usize..8, items_strategy()).prop_map(|(i, items)| Op::Edit(i, items));
    if with_delete {
        prop_oneof![
            3 => create,
            3 => edit,
            1 => (0usize..8).prop_map(Op::Delete),
        ]
        .boxed()
    } else {
        prop_oneof![create, edit].boxed()
    }
}

struct Shop {
    policy: CategoryCurrencyPolicy,
    products: Vec<ProductSnapshot>,
    orders: Vec<OrderState>,
    ledger: Vec<NewLedgerEntry>,
    client: UserId,
}

impl Shop {
    fn new() -> Self {
        let make = |name: &str, category: &str, cents: i64| ProductSnapshot {
            id: ProductId::new(),
            name: name.into(),
            category: category.into(),
            price: Decimal::new(cents, 2),
            stock_quantity: INITIAL_STOCK,
            enabled: true,
        };
        Self {
            policy: CategoryCurrencyPolicy::default(),
            products: vec![
                make("Phone", "smartphones", 19_999),
                make("Charger", "accessories", 1_050),
                make("Case", "accessories", 500),
                make("Speaker", "audio", 4_200),
            ],
            orders: Vec::new(),
            ledger: Vec::new(),
            client: UserId::new(),
        }
    }

    fn catalog(&self) -> ProductCatalog {
        self.products.iter().cloned().collect()
    }

    fn inputs(&self, items: &[(usize, i32)]) -> Vec<OrderItemInput> {
        items
            .iter()
            .map(|(idx, quantity)| OrderItemInput {
                product_id: self.products[*idx].id,
                quantity: *quantity,
                price: None,
            })
            .collect()
    }

    fn apply_stock(&mut self, plan: &StockPlan) {
        for (product_id, delta) in plan.net_by_product() {
            if let Some(p) = self.products.iter_mut().find(|p| p.id == product_id) {
                p.stock_quantity += delta;
            }
        }
    }

    fn apply(&mut self, op: &Op) {
        let catalog = self.catalog();
        let policy = self.policy.clone();
        let service = OrderService::new(&policy);
        match op {
            Op::Create(items) => {
                let input = CreateOrderInput {
                    order_id: OrderId::new(),
                    party: OrderParty::Client {
                        client_id: self.client,
                    },
                    status: OrderStatus::Pending,
                    items: self.inputs(items),
                    discount: None,
                    created_by: self.client,
                };
                if let Ok(plan) = service.plan_creation(&input, &catalog) {
                    self.apply_stock(&plan.stock);
                    self.ledger.extend(plan.ledger_entries);
                    self.orders.push(OrderState {
                        id: input.order_id,
                        party: input.party,
                        status: input.status,
                        lines: plan.lines,
                        totals: plan.totals,
                    });
                }
            }
            Op::Edit(idx, items) => {
                if self.orders.is_empty() {
                    return;
                }
                let pos = idx % self.orders.len();
                let update = OrderUpdate {
                    items: Some(self.inputs(items)),
                    status: None,
                    preserve_discount: false,
                    actor: self.client,
                };
                if let Ok(plan) = service.plan_update(&self.orders[pos], &update, &catalog) {
                    if let Some(replacement) = plan.items {
                        self.apply_stock(&replacement.stock);
                        self.ledger.extend(replacement.ledger_entries);
                        self.orders[pos].lines = replacement.lines;
                        self.orders[pos].totals = replacement.totals;
                    }
                }
            }
            Op::Delete(idx) => {
                if self.orders.is_empty() {
                    return;
                }
                let pos = idx % self.orders.len();
                let plan = OrderService::plan_deletion(&self.orders[pos]);
                self.apply_stock(&plan.stock);
                self.orders.remove(pos);
            }
        }
    }

    fn allocated(&self, product_id: ProductId) -> i32 {
        self.orders
            .iter()
            .flat_map(|o| o.lines.iter())
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    fn debt(&self) -> CurrencyTotals {
        self.ledger.iter().map(|e| (e.currency, -e.amount)).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_stock_is_conserved(ops in prop::collection::vec(op_strategy(true), 1..30)) {
        let mut shop = Shop::new();
        for op in &ops {
            shop.apply(op);
        }
        for product in &shop.products {
            prop_assert!(product.stock_quantity >= 0);
            prop_assert_eq!(
                INITIAL_STOCK - product.stock_quantity,
                shop.allocated(product.id)
            );
        }
    }

    #[test]
    fn prop_resubmitting_items_is_noop(
        (items, shuffled) in items_strategy()
            .prop_flat_map(|items| (Just(items.clone()), Just(items).prop_shuffle())),
    ) {
        let mut shop = Shop::new();
        shop.apply(&Op::Create(items));
        prop_assume!(!shop.orders.is_empty());

        let catalog = shop.catalog();
        let service = OrderService::new(&shop.policy);
        let update = OrderUpdate {
            items: Some(shop.inputs(&shuffled)),
            status: None,
            preserve_discount: false,
            actor: shop.client,
        };
        let plan = service.plan_update(&shop.orders[0], &update, &catalog).unwrap();
        prop_assert!(plan.is_noop());
    }

    #[test]
    fn prop_debt_tracks_live_orders(ops in prop::collection::vec(op_strategy(false), 1..30)) {
        let mut shop = Shop::new();
        for op in &ops {
            shop.apply(op);
        }

        let catalog = shop.catalog();
        let service = OrderService::new(&shop.policy);
        let mut expected = CurrencyTotals::new();
        for order in &shop.orders {
            let owed = service.settlement_totals(&order.lines, &catalog, None).unwrap();
            for currency in Currency::ALL {
                expected.add(currency, owed.get(currency));
            }
        }

        let debt = shop.debt();
        for currency in Currency::ALL {
            prop_assert_eq!(debt.get(currency), expected.get(currency));
        }
    }
}
