//! Concurrent order mutation tests.
//!
//! Many edits race on one order. Whatever order they land in, the client's
//! debt must equal the final order value and stock must match the final
//! items.

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use kasa_core::order::{OrderItemInput, OrderParty, OrderStatus, OrderUpdate};
use kasa_db::entities::sea_orm_active_enums::UserRole;
use kasa_db::repositories::{LedgerRepository, NewOrder};
use kasa_shared::types::Currency;

use common::{Fixture, order_repo, stock_of, try_connect};

const EDITS: usize = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_keep_debt_and_stock_consistent() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Race Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Race Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Cable", "accessories", dec!(10), 100).await.unwrap();
    let b = fx.product(&db, "Phone", "smartphones", dec!(90), 100).await.unwrap();

    let orders = Arc::new(order_repo(&db));
    let order = orders
        .create(NewOrder {
            party: OrderParty::Client { client_id: client },
            status: OrderStatus::Pending,
            items: vec![OrderItemInput {
                product_id: a,
                quantity: 1,
                price: None,
            }],
            discount: None,
            notes: None,
            created_by: admin,
        })
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(EDITS));
    let tasks = (0..EDITS).map(|i| {
        let orders = Arc::clone(&orders);
        let barrier = Arc::clone(&barrier);
        let quantity = i32::try_from(i % 5 + 1).unwrap();
        tokio::spawn(async move {
            let mut items = vec![OrderItemInput {
                product_id: a,
                quantity,
                price: None,
            }];
            if i % 2 == 0 {
                items.push(OrderItemInput {
                    product_id: b,
                    quantity: 1,
                    price: None,
                });
            }
            barrier.wait().await;
            orders
                .update(
                    order.id,
                    OrderUpdate {
                        items: Some(items),
                        status: None,
                        preserve_discount: false,
                        actor: admin,
                    },
                )
                .await
        })
    });

    let results = join_all(tasks).await;
    for result in results {
        result.unwrap().unwrap();
    }

    let final_order = orders.find(order.id).await.unwrap().unwrap();
    let balance = LedgerRepository::new(db.clone())
        .client_balance(client)
        .await
        .unwrap();
    for currency in Currency::ALL {
        assert_eq!(
            balance.debt_in(currency),
            final_order.totals_by_currency.get(currency),
            "debt drifted in {}",
            currency
        );
    }

    let allocated = |product| {
        final_order
            .items
            .iter()
            .filter(|i| i.product_id == product)
            .map(|i| i.quantity)
            .sum::<i32>()
    };
    assert_eq!(stock_of(&db, a).await, 100 - allocated(a));
    assert_eq!(stock_of(&db, b).await, 100 - allocated(b));
    assert!(final_order.total_amount > Decimal::ZERO);

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_never_oversell() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Oversell Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Oversell Client", UserRole::Client).await.unwrap();
    let scarce = fx.product(&db, "Last Units", "accessories", dec!(5), 5).await.unwrap();

    let orders = Arc::new(order_repo(&db));
    let barrier = Arc::new(Barrier::new(10));
    let tasks = (0..10).map(|_| {
        let orders = Arc::clone(&orders);
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            orders
                .create(NewOrder {
                    party: OrderParty::Client { client_id: client },
                    status: OrderStatus::Pending,
                    items: vec![OrderItemInput {
                        product_id: scarce,
                        quantity: 1,
                        price: None,
                    }],
                    discount: None,
                    notes: None,
                    created_by: admin,
                })
                .await
        })
    });

    let succeeded = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    assert_eq!(succeeded, 5);
    assert_eq!(stock_of(&db, scarce).await, 0);

    let balance = LedgerRepository::new(db.clone())
        .client_balance(client)
        .await
        .unwrap();
    assert_eq!(balance.debt_in(Currency::Mkd), dec!(25));

    fx.cleanup(&db).await.unwrap();
}
