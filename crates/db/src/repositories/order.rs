//! Order repository.
//!
//! Every mutation loads the stored order under lock, asks
//! [`OrderService`] for a plan and applies the whole plan (order row, items,
//! stock movements, ledger entries) in one transaction.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info};

use kasa_core::currency::{CurrencyPolicy, CurrencyTotals};
use kasa_core::invoice::{InvoiceBuilder, InvoiceCustomer, InvoiceDocument};
use kasa_core::order::{
    CreateOrderInput, Discount, OrderError, OrderItemInput, OrderLine, OrderParty, OrderService,
    OrderState, OrderStatus, OrderTotals, OrderUpdate, ProductCatalog,
};
use kasa_shared::types::{Currency, OrderId, PageRequest, PageResponse, ProductId, UserId};

use crate::entities::{
    order_items, orders,
    sea_orm_active_enums::{self as db_enums, UserRole},
    users,
};
use crate::locks::OrderLocks;
use crate::mapping;
use crate::repositories::ledger::LedgerRepository;
use crate::repositories::product::ProductRepository;

/// Error types for order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderRepoError {
    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Client referenced by a new order does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(UserId),

    /// User referenced by a new order is not a client.
    #[error("User {0} is not a client")]
    NotAClient(UserId),

    /// Domain rule violated.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for a new order. The repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Owner.
    pub party: OrderParty,
    /// Initial status.
    pub status: OrderStatus,
    /// Requested items.
    pub items: Vec<OrderItemInput>,
    /// Discount, if any.
    pub discount: Option<Discount>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Acting user.
    pub created_by: UserId,
}

/// Order list filters.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to one client.
    pub client_id: Option<UserId>,
    /// Restrict to one status.
    pub status: Option<OrderStatus>,
}

/// An order line as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetails {
    /// Product ID.
    pub product_id: ProductId,
    /// Product name.
    pub product_name: String,
    /// Settlement currency of the line.
    pub currency: Currency,
    /// Quantity.
    pub quantity: i32,
    /// Unit price snapshot.
    pub price: Decimal,
    /// `quantity * price`.
    pub line_total: Decimal,
}

/// An order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    /// Order ID.
    pub id: OrderId,
    /// Owner.
    pub party: OrderParty,
    /// Client's full name for client orders.
    pub client_name: Option<String>,
    /// Current status.
    pub status: OrderStatus,
    /// Status at creation.
    pub original_status: OrderStatus,
    /// Sum of line totals before discount.
    pub original_total: Decimal,
    /// Total after discount.
    pub total_amount: Decimal,
    /// Applied discount.
    pub discount: Option<Discount>,
    /// Amount owed per settlement currency.
    pub totals_by_currency: CurrencyTotals,
    /// Notes.
    pub notes: Option<String>,
    /// Lines in stored order.
    pub items: Vec<OrderItemDetails>,
    /// Creator.
    pub created_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Repository for orders.
#[derive(Clone)]
pub struct OrderRepository {
    db: DatabaseConnection,
    policy: Arc<dyn CurrencyPolicy>,
    locks: OrderLocks,
}

impl std::fmt::Debug for OrderRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderRepository")
            .field("policy", &self.policy)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl OrderRepository {
    /// Creates a new order repository.
    ///
    /// Repositories that may mutate the same orders must share `locks`.
    #[must_use]
    pub fn new(db: DatabaseConnection, policy: Arc<dyn CurrencyPolicy>, locks: OrderLocks) -> Self {
        Self { db, policy, locks }
    }

    /// The currency policy orders are settled with.
    #[must_use]
    pub fn policy(&self) -> &dyn CurrencyPolicy {
        self.policy.as_ref()
    }

    fn service(&self) -> OrderService<'_> {
        OrderService::new(self.policy.as_ref())
    }

    /// Creates an order, allocates stock and records the client's debt.
    ///
    /// # Errors
    ///
    /// Returns `ClientNotFound`/`NotAClient` for a bad owner, `Order` for
    /// rejected input or stock, or a database error. Nothing is written on
    /// error.
    pub async fn create(&self, new: NewOrder) -> Result<OrderDetails, OrderRepoError> {
        if let Some(client_id) = new.party.client_id() {
            let client = users::Entity::find_by_id(client_id.into_inner())
                .one(&self.db)
                .await?
                .ok_or(OrderRepoError::ClientNotFound(client_id))?;
            if client.role != UserRole::Client {
                return Err(OrderRepoError::NotAClient(client_id));
            }
        }

        let input = CreateOrderInput {
            order_id: OrderId::new(),
            party: new.party,
            status: new.status,
            items: new.items,
            discount: new.discount,
            created_by: new.created_by,
        };

        let txn = self.db.begin().await?;

        let ids: BTreeSet<ProductId> = input.items.iter().map(|i| i.product_id).collect();
        let catalog = ProductRepository::lock_catalog(&txn, &ids).await?;
        let plan = self.service().plan_creation(&input, &catalog)?;

        let (client_id, guest) = match &input.party {
            OrderParty::Client { client_id } => (Some(client_id.into_inner()), None),
            OrderParty::Guest(guest) => (None, Some(guest.clone())),
        };
        let now = Utc::now().into();
        orders::ActiveModel {
            id: Set(input.order_id.into_inner()),
            client_id: Set(client_id),
            guest_name: Set(guest.as_ref().map(|g| g.name.trim().to_string())),
            guest_email: Set(guest.as_ref().and_then(|g| g.email.clone())),
            guest_phone: Set(guest.as_ref().and_then(|g| g.phone.clone())),
            status: Set(input.status.into()),
            original_status: Set(input.status.into()),
            original_total: Set(plan.totals.original_total),
            total_amount: Set(plan.totals.total_amount),
            discount_amount: Set(discount_amount(&plan.totals)),
            discount_currency: Set(discount_currency(&plan.totals)),
            notes: Set(new.notes),
            created_by: Set(Some(input.created_by.into_inner())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_lines(&txn, input.order_id, &plan.lines).await?;
        ProductRepository::apply_stock(&txn, &plan.stock).await?;
        for entry in plan.ledger_entries {
            LedgerRepository::append_with(&txn, entry).await?;
        }

        txn.commit().await?;

        info!(
            order_id = %input.order_id,
            status = %input.status,
            total = %plan.totals.total_amount,
            "Order created"
        );

        self.find(input.order_id)
            .await?
            .ok_or(OrderRepoError::NotFound(input.order_id))
    }

    /// Applies a status change and/or item replacement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Order` for rejected changes or stock, or a
    /// database error. Nothing is written on error.
    pub async fn update(
        &self,
        order_id: OrderId,
        update: OrderUpdate,
    ) -> Result<OrderDetails, OrderRepoError> {
        let _guard = self.locks.acquire(order_id).await;
        let txn = self.db.begin().await?;

        let (order, state) = load_locked(&txn, order_id).await?;

        let mut ids: BTreeSet<ProductId> = state.lines.iter().map(|l| l.product_id).collect();
        if let Some(items) = &update.items {
            ids.extend(items.iter().map(|i| i.product_id));
        }
        let catalog = ProductRepository::lock_catalog(&txn, &ids).await?;
        let plan = self.service().plan_update(&state, &update, &catalog)?;

        if plan.is_noop() {
            txn.commit().await?;
            debug!(order_id = %order_id, "Order update changed nothing");
            return self.find(order_id).await?.ok_or(OrderRepoError::NotFound(order_id));
        }

        let mut active: orders::ActiveModel = order.into();
        if let Some(status) = plan.status {
            active.status = Set(status.into());
        }

        let mut ledger_entries = 0;
        if let Some(items) = plan.items {
            ProductRepository::apply_stock(&txn, &items.stock).await?;

            order_items::Entity::delete_many()
                .filter(order_items::Column::OrderId.eq(order_id.into_inner()))
                .exec(&txn)
                .await?;
            insert_lines(&txn, order_id, &items.lines).await?;

            active.original_total = Set(items.totals.original_total);
            active.total_amount = Set(items.totals.total_amount);
            active.discount_amount = Set(discount_amount(&items.totals));
            active.discount_currency = Set(discount_currency(&items.totals));

            ledger_entries = items.ledger_entries.len();
            for entry in items.ledger_entries {
                LedgerRepository::append_with(&txn, entry).await?;
            }
        }
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = %order_id,
            status = ?plan.status,
            ledger_entries,
            "Order updated"
        );

        self.find(order_id).await?.ok_or(OrderRepoError::NotFound(order_id))
    }

    /// Deletes an order and gives its stock back. The ledger is untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn delete(&self, order_id: OrderId) -> Result<(), OrderRepoError> {
        {
            let _guard = self.locks.acquire(order_id).await;
            let txn = self.db.begin().await?;

            let (_, state) = load_locked(&txn, order_id).await?;
            let ids: BTreeSet<ProductId> = state.lines.iter().map(|l| l.product_id).collect();
            ProductRepository::lock_catalog(&txn, &ids).await?;

            let plan = OrderService::plan_deletion(&state);
            ProductRepository::apply_stock(&txn, &plan.stock).await?;
            orders::Entity::delete_by_id(order_id.into_inner())
                .exec(&txn)
                .await?;

            txn.commit().await?;
        }
        self.locks.forget(order_id);

        info!(order_id = %order_id, "Order deleted");
        Ok(())
    }

    /// Finds an order with its items.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn find(&self, order_id: OrderId) -> Result<Option<OrderDetails>, OrderRepoError> {
        let Some(order) = orders::Entity::find_by_id(order_id.into_inner())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.details(vec![order]).await?.pop())
    }

    /// Lists orders newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<PageResponse<OrderDetails>, OrderRepoError> {
        let page = page.normalized();
        let mut query = orders::Entity::find();
        if let Some(client_id) = filter.client_id {
            query = query.filter(orders::Column::ClientId.eq(client_id.into_inner()));
        }
        if let Some(status) = filter.status {
            query = query.filter(orders::Column::Status.eq(db_enums::OrderStatus::from(status)));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let data = self.details(rows).await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Builds the invoice of an order with the client's current debt.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn invoice(&self, order_id: OrderId) -> Result<InvoiceDocument, OrderRepoError> {
        let order = orders::Entity::find_by_id(order_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(OrderRepoError::NotFound(order_id))?;
        let items = order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order_id.into_inner()))
            .all(&self.db)
            .await?;

        let state = mapping::order_state(&order, &items);
        let ids: BTreeSet<ProductId> = state.lines.iter().map(|l| l.product_id).collect();
        let catalog = ProductRepository::catalog(&self.db, &ids).await?;

        let (customer, balance) = match state.party.client_id() {
            Some(client_id) => {
                let client = users::Entity::find_by_id(client_id.into_inner())
                    .one(&self.db)
                    .await?;
                let balance = LedgerRepository::client_balance_with(&self.db, client_id).await?;
                let customer = client.map_or_else(
                    || InvoiceCustomer {
                        name: String::new(),
                        company: None,
                        email: None,
                        phone: None,
                    },
                    |c| InvoiceCustomer {
                        name: c.full_name,
                        company: c.company,
                        email: Some(c.email),
                        phone: c.phone,
                    },
                );
                (customer, Some(balance))
            }
            None => (
                InvoiceCustomer {
                    name: order.guest_name.clone().unwrap_or_default(),
                    company: None,
                    email: order.guest_email.clone(),
                    phone: order.guest_phone.clone(),
                },
                None,
            ),
        };

        Ok(InvoiceBuilder::new(self.policy.as_ref()).build(
            &state,
            &catalog,
            customer,
            balance.as_ref(),
            Utc::now(),
        )?)
    }

    /// Completed orders with the catalog their lines reference.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn completed(&self) -> Result<(Vec<OrderState>, ProductCatalog), DbErr> {
        let rows = orders::Entity::find()
            .filter(orders::Column::Status.eq(db_enums::OrderStatus::Completed))
            .all(&self.db)
            .await?;
        let items = items_by_order(&self.db, &rows).await?;

        let states: Vec<OrderState> = rows
            .iter()
            .map(|o| mapping::order_state(o, items.get(&o.id).map_or(&[][..], Vec::as_slice)))
            .collect();
        let ids: BTreeSet<ProductId> = states
            .iter()
            .flat_map(|s| s.lines.iter().map(|l| l.product_id))
            .collect();
        let catalog = ProductRepository::catalog(&self.db, &ids).await?;

        Ok((states, catalog))
    }

    async fn details(&self, rows: Vec<orders::Model>) -> Result<Vec<OrderDetails>, OrderRepoError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let items = items_by_order(&self.db, &rows).await?;

        let product_ids: BTreeSet<ProductId> = items
            .values()
            .flatten()
            .map(|i| ProductId::from(i.product_id))
            .collect();
        let catalog = ProductRepository::catalog(&self.db, &product_ids).await?;

        let client_ids: Vec<uuid::Uuid> = rows.iter().filter_map(|o| o.client_id).collect();
        let client_names: HashMap<uuid::Uuid, String> = if client_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(client_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.full_name))
                .collect()
        };

        let service = self.service();
        let mut out = Vec::with_capacity(rows.len());
        for order in rows {
            let state =
                mapping::order_state(&order, items.get(&order.id).map_or(&[][..], Vec::as_slice));
            let totals_by_currency =
                service.settlement_totals(&state.lines, &catalog, state.totals.discount)?;

            let mut lines = Vec::with_capacity(state.lines.len());
            for line in &state.lines {
                let product = catalog.get(line.product_id)?;
                lines.push(OrderItemDetails {
                    product_id: line.product_id,
                    product_name: product.name.clone(),
                    currency: self.policy.currency_for_category(&product.category),
                    quantity: line.quantity,
                    price: line.price,
                    line_total: line.line_total(),
                });
            }

            out.push(OrderDetails {
                id: state.id,
                client_name: order.client_id.and_then(|id| client_names.get(&id).cloned()),
                party: state.party,
                status: state.status,
                original_status: order.original_status.into(),
                original_total: state.totals.original_total,
                total_amount: state.totals.total_amount,
                discount: state.totals.discount,
                totals_by_currency,
                notes: order.notes,
                items: lines,
                created_by: order.created_by.map(UserId::from),
                created_at: order.created_at.into(),
                updated_at: order.updated_at.into(),
            });
        }
        Ok(out)
    }
}

/// Loads and row-locks an order and its items.
async fn load_locked<C: ConnectionTrait>(
    conn: &C,
    order_id: OrderId,
) -> Result<(orders::Model, OrderState), OrderRepoError> {
    let order = orders::Entity::find_by_id(order_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(OrderRepoError::NotFound(order_id))?;
    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.eq(order_id.into_inner()))
        .all(conn)
        .await?;

    let state = mapping::order_state(&order, &items);
    Ok((order, state))
}

async fn items_by_order<C: ConnectionTrait>(
    conn: &C,
    rows: &[orders::Model],
) -> Result<HashMap<uuid::Uuid, Vec<order_items::Model>>, DbErr> {
    let order_ids: Vec<uuid::Uuid> = rows.iter().map(|o| o.id).collect();
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let items = order_items::Entity::find()
        .filter(order_items::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_items::Column::Position)
        .all(conn)
        .await?;

    let mut grouped: HashMap<uuid::Uuid, Vec<order_items::Model>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: OrderId,
    lines: &[OrderLine],
) -> Result<(), DbErr> {
    let models = lines.iter().enumerate().map(|(position, line)| order_items::ActiveModel {
        id: Set(uuid::Uuid::now_v7()),
        order_id: Set(order_id.into_inner()),
        product_id: Set(line.product_id.into_inner()),
        quantity: Set(line.quantity),
        price: Set(line.price),
        position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
    });
    order_items::Entity::insert_many(models).exec(conn).await?;
    Ok(())
}

fn discount_amount(totals: &OrderTotals) -> Decimal {
    totals.discount.map_or(Decimal::ZERO, |d| d.amount)
}

fn discount_currency(totals: &OrderTotals) -> Option<db_enums::CurrencyCode> {
    totals.discount.map(|d| d.currency.into())
}
