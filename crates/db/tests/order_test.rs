//! Order lifecycle integration tests.
//!
//! Creation, item replacement, status changes and deletion, checking stock
//! and the client's ledger after each step.

#![allow(clippy::uninlined_format_args)]

mod common;

use rust_decimal_macros::dec;

use kasa_core::ledger::ManualAdjustmentInput;
use kasa_core::order::{
    Discount, GuestContact, OrderError, OrderItemInput, OrderParty, OrderStatus, OrderUpdate,
};
use kasa_db::entities::sea_orm_active_enums::{self as db_enums, UserRole};
use kasa_db::repositories::{
    LedgerRepository, NewOrder, OrderRepoError, UserError, UserRepository,
};
use kasa_shared::types::{Currency, ProductId, UserId};

use common::{Fixture, entries_for, order_repo, stock_of, try_connect};

fn item(product_id: ProductId, quantity: i32) -> OrderItemInput {
    OrderItemInput {
        product_id,
        quantity,
        price: None,
    }
}

fn client_order(client: UserId, admin: UserId, items: Vec<OrderItemInput>) -> NewOrder {
    NewOrder {
        party: OrderParty::Client { client_id: client },
        status: OrderStatus::Pending,
        items,
        discount: None,
        notes: None,
        created_by: admin,
    }
}

fn edit(items: Vec<OrderItemInput>, actor: UserId) -> OrderUpdate {
    OrderUpdate {
        items: Some(items),
        status: None,
        preserve_discount: false,
        actor,
    }
}

#[tokio::test]
async fn test_edit_writes_net_change_per_currency() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Edit Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Edit Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Cable", "accessories", dec!(10), 10).await.unwrap();
    let b = fx.product(&db, "Charger", "accessories", dec!(5), 10).await.unwrap();
    let c = fx.product(&db, "Case", "accessories", dec!(20), 10).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(a, 2), item(b, 1)]))
        .await
        .unwrap();
    assert_eq!(order.total_amount, dec!(25));

    let updated = orders
        .update(order.id, edit(vec![item(a, 3), item(c, 1)], admin))
        .await
        .unwrap();
    assert_eq!(updated.total_amount, dec!(50));
    assert_eq!(updated.original_total, dec!(50));

    let entries = entries_for(&db, client).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].amount, dec!(-25));
    assert_eq!(entries[1].currency, db_enums::CurrencyCode::Mkd);
    assert_eq!(entries[1].kind, db_enums::LedgerEntryKind::OrderDebit);
    assert_eq!(entries[1].order_id, Some(order.id.into_inner()));

    assert_eq!(stock_of(&db, a).await, 7);
    assert_eq!(stock_of(&db, b).await, 10);
    assert_eq!(stock_of(&db, c).await, 9);

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_resubmitting_same_items_is_noop() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Noop Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Noop Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Phone", "smartphones", dec!(200), 10).await.unwrap();
    let b = fx.product(&db, "Glass", "accessories", dec!(300), 10).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(a, 1), item(b, 2)]))
        .await
        .unwrap();
    let before = entries_for(&db, client).await.len();

    // Same quantities in a different order and with a split line.
    orders
        .update(order.id, edit(vec![item(b, 1), item(a, 1), item(b, 1)], admin))
        .await
        .unwrap();

    assert_eq!(entries_for(&db, client).await.len(), before);
    assert_eq!(stock_of(&db, a).await, 9);
    assert_eq!(stock_of(&db, b).await, 8);

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back_edit() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Stock Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Stock Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Earbuds", "accessories", dec!(15), 3).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(a, 2)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, a).await, 1);

    // 2 restored + 1 on hand = 3 available.
    let result = orders.update(order.id, edit(vec![item(a, 4)], admin)).await;
    assert!(matches!(
        result,
        Err(OrderRepoError::Order(OrderError::InsufficientStock { .. }))
    ));
    assert_eq!(stock_of(&db, a).await, 1);
    assert_eq!(entries_for(&db, client).await.len(), 1);

    orders
        .update(order.id, edit(vec![item(a, 3)], admin))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, a).await, 0);

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_completed_and_guest_orders_write_no_ledger() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Quiet Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Quiet Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Tablet", "smartphones", dec!(400), 5).await.unwrap();

    let orders = order_repo(&db);
    orders
        .create(NewOrder {
            status: OrderStatus::Completed,
            ..client_order(client, admin, vec![item(a, 1)])
        })
        .await
        .unwrap();
    orders
        .create(NewOrder {
            party: OrderParty::Guest(GuestContact {
                name: "Walk-in".into(),
                email: None,
                phone: None,
            }),
            ..client_order(client, admin, vec![item(a, 1)])
        })
        .await
        .unwrap();

    assert!(entries_for(&db, client).await.is_empty());
    assert_eq!(stock_of(&db, a).await, 3);

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_discount_reduces_creation_debt() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Discount Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Discount Client", UserRole::Client).await.unwrap();
    let phone = fx.product(&db, "Phone", "smartphones", dec!(250), 5).await.unwrap();
    let case = fx.product(&db, "Case", "accessories", dec!(300), 5).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(NewOrder {
            discount: Some(Discount {
                amount: dec!(50),
                currency: Currency::Mkd,
            }),
            ..client_order(client, admin, vec![item(phone, 1), item(case, 2)])
        })
        .await
        .unwrap();
    assert_eq!(order.total_amount, dec!(800));
    assert_eq!(order.totals_by_currency.get(Currency::Mkd), dec!(550));

    let entries = entries_for(&db, client).await;
    let mut amounts: Vec<_> = entries.iter().map(|e| (e.currency.clone(), e.amount)).collect();
    amounts.sort_by_key(|(_, amount)| *amount);
    assert_eq!(
        amounts,
        vec![
            (db_enums::CurrencyCode::Mkd, dec!(-550)),
            (db_enums::CurrencyCode::Eur, dec!(-250)),
        ]
    );

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_status_changes() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Status Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Status Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Cable", "accessories", dec!(10), 5).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(a, 1)]))
        .await
        .unwrap();

    let status = |next| OrderUpdate {
        items: None,
        status: Some(next),
        preserve_discount: false,
        actor: admin,
    };

    assert!(matches!(
        orders.update(order.id, status(OrderStatus::Shipped)).await,
        Err(OrderRepoError::Order(OrderError::UnsupportedStatus(_)))
    ));

    let done = orders
        .update(order.id, status(OrderStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert_eq!(done.original_status, OrderStatus::Pending);

    assert!(matches!(
        orders.update(order.id, status(OrderStatus::Pending)).await,
        Err(OrderRepoError::Order(OrderError::InvalidStatusTransition { .. }))
    ));
    // Completing twice is accepted.
    orders
        .update(order.id, status(OrderStatus::Completed))
        .await
        .unwrap();
    assert_eq!(entries_for(&db, client).await.len(), 1);

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_delete_restores_stock_and_keeps_ledger() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Delete Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Delete Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Cable", "accessories", dec!(10), 5).await.unwrap();
    let b = fx.product(&db, "Adapter", "accessories", dec!(7), 5).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(a, 2), item(b, 3)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, a).await, 3);
    assert_eq!(stock_of(&db, b).await, 2);

    // A client with a pending order cannot be deleted.
    let users = UserRepository::new(db.clone());
    assert!(matches!(
        users.delete(client).await,
        Err(UserError::HasPendingOrders(1))
    ));

    orders.delete(order.id).await.unwrap();
    assert_eq!(stock_of(&db, a).await, 5);
    assert_eq!(stock_of(&db, b).await, 5);
    assert!(orders.find(order.id).await.unwrap().is_none());

    let entries = entries_for(&db, client).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].order_id, None);

    assert!(matches!(
        orders.delete(order.id).await,
        Err(OrderRepoError::NotFound(_))
    ));

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_client_with_unsettled_debt_cannot_be_deleted() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Settle Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Settle Client", UserRole::Client).await.unwrap();
    let a = fx.product(&db, "Cable", "accessories", dec!(10), 5).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(a, 2)]))
        .await
        .unwrap();
    orders
        .update(
            order.id,
            OrderUpdate {
                items: None,
                status: Some(OrderStatus::Completed),
                preserve_discount: false,
                actor: admin,
            },
        )
        .await
        .unwrap();

    // Completing leaves the debit in place, so the client still owes it.
    let users = UserRepository::new(db.clone());
    match users.delete(client).await {
        Err(UserError::HasOutstandingDebt(owed)) => {
            assert_eq!(owed.currency, Currency::Mkd);
            assert_eq!(owed.amount, dec!(20));
        }
        other => panic!("expected outstanding debt, got {:?}", other),
    }
    assert_eq!(entries_for(&db, client).await.len(), 1);

    LedgerRepository::new(db.clone())
        .manual_adjustment(ManualAdjustmentInput {
            client_id: client,
            amount: "20".into(),
            currency: "MKD".into(),
            notes: Some("cash payment".into()),
            created_by: admin,
        })
        .await
        .unwrap();

    users.delete(client).await.unwrap();
    assert!(entries_for(&db, client).await.is_empty());

    fx.cleanup(&db).await.unwrap();
}

#[tokio::test]
async fn test_invoice_carries_current_debt() {
    let Some(db) = try_connect().await else {
        return;
    };
    let mut fx = Fixture::default();
    let admin = fx.user(&db, "Invoice Admin", UserRole::Admin).await.unwrap();
    let client = fx.user(&db, "Invoice Client", UserRole::Client).await.unwrap();
    let phone = fx.product(&db, "Phone", "smartphones", dec!(120), 5).await.unwrap();

    let orders = order_repo(&db);
    let order = orders
        .create(client_order(client, admin, vec![item(phone, 2)]))
        .await
        .unwrap();

    let invoice = orders.invoice(order.id).await.unwrap();
    assert_eq!(invoice.customer.name, "Invoice Client");
    assert_eq!(invoice.lines.len(), 1);
    assert_eq!(invoice.totals.get(Currency::Eur), dec!(240));
    assert_eq!(
        invoice.client_debt.map(|d| d.get(Currency::Eur)),
        Some(dec!(240))
    );

    fx.cleanup(&db).await.unwrap();
}
