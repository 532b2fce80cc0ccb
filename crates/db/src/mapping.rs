//! Conversions between stored rows and domain types.

use kasa_core::ledger::{LedgerEntry, LedgerEntryKind};
use kasa_core::order::{
    Discount, GuestContact, OrderLine, OrderParty, OrderState, OrderStatus, OrderTotals,
    ProductSnapshot,
};
use kasa_shared::types::{Currency, LedgerEntryId, OrderId, ProductId, UserId};
use kasa_shared::Role;

use crate::entities::{ledger_entries, order_items, orders, products, sea_orm_active_enums as db};

impl From<db::CurrencyCode> for Currency {
    fn from(code: db::CurrencyCode) -> Self {
        match code {
            db::CurrencyCode::Eur => Self::Eur,
            db::CurrencyCode::Mkd => Self::Mkd,
        }
    }
}

impl From<Currency> for db::CurrencyCode {
    fn from(currency: Currency) -> Self {
        match currency {
            Currency::Eur => Self::Eur,
            Currency::Mkd => Self::Mkd,
        }
    }
}

impl From<db::LedgerEntryKind> for LedgerEntryKind {
    fn from(kind: db::LedgerEntryKind) -> Self {
        match kind {
            db::LedgerEntryKind::OrderDebit => Self::OrderDebit,
            db::LedgerEntryKind::OrderCredit => Self::OrderCredit,
            db::LedgerEntryKind::ManualAdjustment => Self::ManualAdjustment,
        }
    }
}

impl From<LedgerEntryKind> for db::LedgerEntryKind {
    fn from(kind: LedgerEntryKind) -> Self {
        match kind {
            LedgerEntryKind::OrderDebit => Self::OrderDebit,
            LedgerEntryKind::OrderCredit => Self::OrderCredit,
            LedgerEntryKind::ManualAdjustment => Self::ManualAdjustment,
        }
    }
}

impl From<db::OrderStatus> for OrderStatus {
    fn from(status: db::OrderStatus) -> Self {
        match status {
            db::OrderStatus::Pending => Self::Pending,
            db::OrderStatus::Approved => Self::Approved,
            db::OrderStatus::Shipped => Self::Shipped,
            db::OrderStatus::Completed => Self::Completed,
            db::OrderStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<OrderStatus> for db::OrderStatus {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => Self::Pending,
            OrderStatus::Approved => Self::Approved,
            OrderStatus::Shipped => Self::Shipped,
            OrderStatus::Completed => Self::Completed,
            OrderStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<db::UserRole> for Role {
    fn from(role: db::UserRole) -> Self {
        match role {
            db::UserRole::Admin => Self::Admin,
            db::UserRole::Client => Self::Client,
        }
    }
}

impl From<Role> for db::UserRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::Client => Self::Client,
        }
    }
}

/// Converts a stored ledger row.
#[must_use]
pub fn ledger_entry(model: ledger_entries::Model) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::from(model.id),
        client_id: UserId::from(model.client_id),
        currency: model.currency.into(),
        amount: model.amount,
        kind: model.kind.into(),
        notes: model.notes,
        order_id: model.order_id.map(OrderId::from),
        created_by: model.created_by.map(UserId::from),
        created_at: model.created_at.into(),
    }
}

/// Converts a stored product row.
#[must_use]
pub fn product_snapshot(model: &products::Model) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::from(model.id),
        name: model.name.clone(),
        category: model.category.clone(),
        price: model.price,
        stock_quantity: model.stock_quantity,
        enabled: model.stock_status == db::StockStatus::Enabled,
    }
}

/// Converts a stored order item row.
#[must_use]
pub fn order_line(model: &order_items::Model) -> OrderLine {
    OrderLine {
        product_id: ProductId::from(model.product_id),
        quantity: model.quantity,
        price: model.price,
    }
}

/// Who owns a stored order.
#[must_use]
pub fn order_party(model: &orders::Model) -> OrderParty {
    match model.client_id {
        Some(client_id) => OrderParty::Client {
            client_id: UserId::from(client_id),
        },
        None => OrderParty::Guest(GuestContact {
            name: model.guest_name.clone().unwrap_or_default(),
            email: model.guest_email.clone(),
            phone: model.guest_phone.clone(),
        }),
    }
}

/// Stored discount, if any.
#[must_use]
pub fn order_discount(model: &orders::Model) -> Option<Discount> {
    match (&model.discount_currency, model.discount_amount.is_zero()) {
        (Some(currency), false) => Some(Discount {
            amount: model.discount_amount,
            currency: currency.clone().into(),
        }),
        _ => None,
    }
}

/// Builds the domain view of a stored order and its items (in stored order).
#[must_use]
pub fn order_state(model: &orders::Model, items: &[order_items::Model]) -> OrderState {
    let mut items: Vec<&order_items::Model> = items.iter().collect();
    items.sort_by_key(|i| i.position);
    OrderState {
        id: OrderId::from(model.id),
        party: order_party(model),
        status: model.status.clone().into(),
        lines: items.into_iter().map(order_line).collect(),
        totals: OrderTotals {
            original_total: model.original_total,
            total_amount: model.total_amount,
            discount: order_discount(model),
        },
    }
}
