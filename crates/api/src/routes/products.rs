//! Product catalog routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{nullable, page_request};
use crate::{AppState, error::ApiError, middleware::AuthUser};
use kasa_core::currency::CurrencyPolicy;
use kasa_db::entities::{products, sea_orm_active_enums::StockStatus};
use kasa_db::repositories::{CreateProductInput, ProductFilter, UpdateProductInput};
use kasa_shared::{PageResponse, types::{Currency, ProductId}};

/// Creates the products router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

/// Query parameters for listing products.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    /// Exact category.
    pub category: Option<String>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Page number.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Request body for creating a product.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category, which decides the currency.
    pub category: String,
    /// Unit price.
    pub price: Decimal,
    /// Units on hand.
    #[serde(default)]
    pub stock_quantity: i32,
    /// Whether the product can be ordered.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// Request body for updating a product. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    /// Name.
    pub name: Option<String>,
    /// Description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    /// Category, which decides the currency.
    pub category: Option<String>,
    /// Unit price.
    pub price: Option<Decimal>,
    /// Units on hand.
    pub stock_quantity: Option<i32>,
    /// Whether the product can be ordered.
    pub enabled: Option<bool>,
}

/// A product with its settlement currency.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category, which decides the currency.
    pub category: String,
    /// Currency the price is quoted and settled in.
    pub currency: Currency,
    /// Unit price.
    pub price: Decimal,
    /// Units on hand.
    pub stock_quantity: i32,
    /// Whether the product can be ordered.
    pub enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    fn new(m: products::Model, policy: &dyn CurrencyPolicy) -> Self {
        Self {
            id: m.id,
            currency: policy.currency_for_category(&m.category),
            name: m.name,
            description: m.description,
            category: m.category,
            price: m.price,
            stock_quantity: m.stock_quantity,
            enabled: m.stock_status == StockStatus::Enabled,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

/// GET /products - List the catalog.
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<PageResponse<ProductResponse>>, ApiError> {
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
    };
    let page = state
        .products()
        .list(&filter, page_request(query.page, query.per_page))
        .await?;
    Ok(Json(page.map(|p| ProductResponse::new(p, state.policy.as_ref()))))
}

/// POST /products - Create a product.
async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    user.require_admin()?;
    let product = state
        .products()
        .create(CreateProductInput {
            name: payload.name,
            description: payload.description,
            category: payload.category,
            price: payload.price,
            stock_quantity: payload.stock_quantity,
            enabled: payload.enabled,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::new(product, state.policy.as_ref())),
    ))
}

/// GET /products/{id} - Fetch one product.
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.products().find_by_id(id).await?.ok_or_else(|| {
        ApiError::new(404, "PRODUCT_NOT_FOUND", format!("Product not found: {id}"))
    })?;
    Ok(Json(ProductResponse::new(product, state.policy.as_ref())))
}

/// PATCH /products/{id} - Update a product.
async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ProductId>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    user.require_admin()?;
    let product = state
        .products()
        .update(
            id,
            UpdateProductInput {
                name: payload.name,
                description: payload.description,
                category: payload.category,
                price: payload.price,
                stock_quantity: payload.stock_quantity,
                enabled: payload.enabled,
            },
        )
        .await?;
    Ok(Json(ProductResponse::new(product, state.policy.as_ref())))
}

/// DELETE /products/{id} - Delete a product no order references.
async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;
    state.products().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
