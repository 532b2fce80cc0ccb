//! Product repository for catalog and inventory operations.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::info;

use kasa_core::dashboard::LowStockProduct;
use kasa_core::order::{ProductCatalog, StockPlan};
use kasa_shared::types::{
    MAX_AMOUNT, MONEY_SCALE, PageRequest, PageResponse, ProductId, fits_money_column,
};

use super::contains_pattern;
use crate::entities::{order_items, products, sea_orm_active_enums::StockStatus};
use crate::mapping;

/// Error types for product operations.
#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    /// Product not found.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Product is referenced by order items.
    #[error("Product {0} is used by existing orders and cannot be deleted")]
    InUse(ProductId),

    /// Price or stock is negative, or a required field is empty.
    #[error("Invalid product: {0}")]
    Invalid(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category.
    pub category: String,
    /// List price.
    pub price: Decimal,
    /// Initial stock.
    pub stock_quantity: i32,
    /// Whether the product can be sold.
    pub enabled: bool,
}

/// Input for updating a product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    /// Name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<Option<String>>,
    /// Category.
    pub category: Option<String>,
    /// List price.
    pub price: Option<Decimal>,
    /// Stock on hand.
    pub stock_quantity: Option<i32>,
    /// Whether the product can be sold.
    pub enabled: Option<bool>,
}

/// Product list filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Exact category.
    pub category: Option<String>,
    /// Case-insensitive name substring.
    pub search: Option<String>,
}

/// Repository for products.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    db: DatabaseConnection,
}

impl ProductRepository {
    /// Creates a new product repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists products by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<PageResponse<products::Model>, DbErr> {
        let page = page.normalized();
        let mut query = products::Entity::find();
        if let Some(category) = filter.category.as_deref() {
            query = query.filter(products::Column::Category.eq(category));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(products::Column::Name)))
                    .like(contains_pattern(search)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(products::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Finds a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_id(&self, id: ProductId) -> Result<Option<products::Model>, DbErr> {
        products::Entity::find_by_id(id.into_inner()).one(&self.db).await
    }

    /// Creates a product.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for negative price or stock, or a database error.
    pub async fn create(&self, input: CreateProductInput) -> Result<products::Model, ProductError> {
        validate(
            Some(&input.name),
            Some(&input.category),
            Some(input.price),
            Some(input.stock_quantity),
        )?;

        let now = chrono::Utc::now().into();
        let product = products::ActiveModel {
            id: Set(ProductId::new().into_inner()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            category: Set(input.category.trim().to_string()),
            price: Set(input.price),
            stock_quantity: Set(input.stock_quantity),
            stock_status: Set(stock_status(input.enabled)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Updates a product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Invalid` or a database error.
    pub async fn update(
        &self,
        id: ProductId,
        input: UpdateProductInput,
    ) -> Result<products::Model, ProductError> {
        validate(
            input.name.as_deref(),
            input.category.as_deref(),
            input.price,
            input.stock_quantity,
        )?;

        let existing = self.find_by_id(id).await?.ok_or(ProductError::NotFound(id))?;
        let mut product: products::ActiveModel = existing.into();

        if let Some(name) = input.name {
            product.name = Set(name.trim().to_string());
        }
        if let Some(description) = input.description {
            product.description = Set(description);
        }
        if let Some(category) = input.category {
            product.category = Set(category.trim().to_string());
        }
        if let Some(price) = input.price {
            product.price = Set(price);
        }
        if let Some(stock) = input.stock_quantity {
            product.stock_quantity = Set(stock);
        }
        if let Some(enabled) = input.enabled {
            product.stock_status = Set(stock_status(enabled));
        }
        product.updated_at = Set(chrono::Utc::now().into());

        Ok(product.update(&self.db).await?)
    }

    /// Deletes a product that no order references.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InUse` or a database error.
    pub async fn delete(&self, id: ProductId) -> Result<(), ProductError> {
        let in_use = order_items::Entity::find()
            .filter(order_items::Column::ProductId.eq(id.into_inner()))
            .count(&self.db)
            .await?;
        if in_use > 0 {
            return Err(ProductError::InUse(id));
        }

        let result = products::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ProductError::NotFound(id));
        }

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Products at or below `threshold` units, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<LowStockProduct>, DbErr> {
        let rows = products::Entity::find()
            .filter(products::Column::StockQuantity.lte(threshold))
            .filter(products::Column::StockStatus.eq(StockStatus::Enabled))
            .order_by_asc(products::Column::StockQuantity)
            .order_by_asc(products::Column::Name)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|p| LowStockProduct {
                id: ProductId::from(p.id),
                name: p.name,
                stock_quantity: p.stock_quantity,
            })
            .collect())
    }

    /// Loads and row-locks `ids` inside a transaction, in id order.
    ///
    /// Locking in a fixed order keeps two orders touching the same products
    /// from deadlocking. Unknown ids are simply absent from the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn lock_catalog<C: ConnectionTrait>(
        conn: &C,
        ids: &BTreeSet<ProductId>,
    ) -> Result<ProductCatalog, DbErr> {
        if ids.is_empty() {
            return Ok(ProductCatalog::new());
        }
        let rows = products::Entity::find()
            .filter(products::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .order_by_asc(products::Column::Id)
            .lock_exclusive()
            .all(conn)
            .await?;

        Ok(rows.iter().map(mapping::product_snapshot).collect())
    }

    /// Loads `ids` without locking.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn catalog<C: ConnectionTrait>(
        conn: &C,
        ids: &BTreeSet<ProductId>,
    ) -> Result<ProductCatalog, DbErr> {
        if ids.is_empty() {
            return Ok(ProductCatalog::new());
        }
        let rows = products::Entity::find()
            .filter(products::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(conn)
            .await?;

        Ok(rows.iter().map(mapping::product_snapshot).collect())
    }

    /// Applies net stock movements with `stock_quantity = stock_quantity + delta`.
    ///
    /// # Errors
    ///
    /// Returns an error if an update fails, including the non-negative stock check.
    pub async fn apply_stock<C: ConnectionTrait>(conn: &C, plan: &StockPlan) -> Result<(), DbErr> {
        for (product_id, delta) in plan.net_by_product() {
            products::Entity::update_many()
                .col_expr(
                    products::Column::StockQuantity,
                    Expr::col(products::Column::StockQuantity).add(delta),
                )
                .filter(products::Column::Id.eq(product_id.into_inner()))
                .exec(conn)
                .await?;
        }
        Ok(())
    }
}

const fn stock_status(enabled: bool) -> StockStatus {
    if enabled {
        StockStatus::Enabled
    } else {
        StockStatus::Disabled
    }
}

fn validate(
    name: Option<&str>,
    category: Option<&str>,
    price: Option<Decimal>,
    stock_quantity: Option<i32>,
) -> Result<(), ProductError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(ProductError::Invalid("name cannot be empty".into()));
    }
    if category.is_some_and(|c| c.trim().is_empty()) {
        return Err(ProductError::Invalid("category cannot be empty".into()));
    }
    if price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(ProductError::Invalid("price cannot be negative".into()));
    }
    if price.is_some_and(|p| !fits_money_column(p)) {
        return Err(ProductError::Invalid(format!(
            "price must have at most {MONEY_SCALE} decimal places and not exceed {MAX_AMOUNT}"
        )));
    }
    if stock_quantity.is_some_and(|s| s < 0) {
        return Err(ProductError::Invalid("stock cannot be negative".into()));
    }
    Ok(())
}
