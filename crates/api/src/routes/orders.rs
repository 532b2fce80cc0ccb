//! Order routes.
//!
//! Admins create, edit and delete any order. A client may place a pending
//! order for itself and read its own orders and invoices.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::info;

use super::page_request;
use crate::{AppState, error::ApiError, middleware::AuthUser};
use kasa_core::invoice::InvoiceDocument;
use kasa_core::order::{Discount, GuestContact, OrderItemInput, OrderParty, OrderStatus, OrderUpdate};
use kasa_db::repositories::{NewOrder, OrderDetails, OrderFilter};
use kasa_shared::{PageResponse, types::{OrderId, UserId}};

/// Creates the orders router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/{id}",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/orders/{id}/invoice", get(get_invoice))
}

/// Query parameters for listing orders.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Restrict to one client. Ignored for clients.
    pub client_id: Option<UserId>,
    /// Order status.
    pub status: Option<OrderStatus>,
    /// Page number.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Request body for creating an order. Exactly one of `client_id` and
/// `guest` names the owner.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Registered client owning the order.
    pub client_id: Option<UserId>,
    /// Walk-in customer.
    pub guest: Option<GuestContact>,
    /// Initial status, `pending` unless given.
    #[serde(default = "pending")]
    pub status: OrderStatus,
    /// Requested lines.
    pub items: Vec<OrderItemInput>,
    /// Flat discount.
    pub discount: Option<Discount>,
    /// Free-form notes.
    pub notes: Option<String>,
}

const fn pending() -> OrderStatus {
    OrderStatus::Pending
}

/// Request body for editing an order.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    /// Replacement item set.
    pub items: Option<Vec<OrderItemInput>>,
    /// New status.
    pub status: Option<OrderStatus>,
    /// Keep the stored discount when items change.
    #[serde(default)]
    pub preserve_discount: bool,
}

/// Resolves the owner of a new order for the acting user.
fn order_party(user: &AuthUser, payload: &CreateOrderRequest) -> Result<OrderParty, ApiError> {
    if !user.is_admin() {
        if payload.guest.is_some() || payload.client_id.is_some_and(|id| id != user.user_id()) {
            return Err(ApiError::forbidden("Clients can only order for themselves"));
        }
        if payload.status != OrderStatus::Pending || payload.discount.is_some() {
            return Err(ApiError::forbidden(
                "Clients can only place pending orders without discount",
            ));
        }
        if payload.items.iter().any(|item| item.price.is_some()) {
            return Err(ApiError::forbidden("Clients cannot set item prices"));
        }
        return Ok(OrderParty::Client {
            client_id: user.user_id(),
        });
    }

    match (payload.client_id, &payload.guest) {
        (Some(client_id), None) => Ok(OrderParty::Client { client_id }),
        (None, Some(guest)) => {
            if guest.name.trim().is_empty() {
                return Err(ApiError::validation("Guest name is required"));
            }
            Ok(OrderParty::Guest(guest.clone()))
        }
        _ => Err(ApiError::validation(
            "Provide exactly one of client_id or guest",
        )),
    }
}

/// Loads an order the acting user may see.
async fn visible_order(
    state: &AppState,
    user: &AuthUser,
    id: OrderId,
) -> Result<OrderDetails, ApiError> {
    let not_found = || ApiError::new(404, "ORDER_NOT_FOUND", format!("Order not found: {id}"));
    let order = state.orders().find(id).await?.ok_or_else(not_found)?;
    match order.party.client_id() {
        Some(client_id) => user.require_view(client_id)?,
        None => user.require_admin()?,
    }
    Ok(order)
}

/// GET /orders - List orders, newest first.
async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PageResponse<OrderDetails>>, ApiError> {
    let client_id = if user.is_admin() {
        query.client_id
    } else {
        Some(user.user_id())
    };
    let filter = OrderFilter {
        client_id,
        status: query.status,
    };
    let page = state
        .orders()
        .list(&filter, page_request(query.page, query.per_page))
        .await?;
    Ok(Json(page))
}

/// POST /orders - Place an order.
async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError> {
    let party = order_party(&user, &payload)?;
    let order = state
        .orders()
        .create(NewOrder {
            party,
            status: payload.status,
            items: payload.items,
            discount: payload.discount,
            notes: payload.notes.filter(|n| !n.trim().is_empty()),
            created_by: user.user_id(),
        })
        .await?;

    info!(order_id = %order.id, created_by = %user.user_id(), "Order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id} - Fetch one order.
async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetails>, ApiError> {
    Ok(Json(visible_order(&state, &user, id).await?))
}

/// PATCH /orders/{id} - Replace items and/or change status.
async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<OrderId>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<OrderDetails>, ApiError> {
    user.require_admin()?;
    if payload.items.is_none() && payload.status.is_none() {
        return Err(ApiError::validation("Nothing to update"));
    }
    let order = state
        .orders()
        .update(
            id,
            OrderUpdate {
                items: payload.items,
                status: payload.status,
                preserve_discount: payload.preserve_discount,
                actor: user.user_id(),
            },
        )
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{id} - Delete an order and return its stock.
async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;
    state.orders().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/{id}/invoice - Invoice data for rendering.
async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<OrderId>,
) -> Result<Json<InvoiceDocument>, ApiError> {
    visible_order(&state, &user, id).await?;
    Ok(Json(state.orders().invoice(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasa_shared::{Claims, Role};

    fn auth(role: Role) -> AuthUser {
        AuthUser(Claims {
            sub: uuid::Uuid::now_v7(),
            role,
            iat: 0,
            exp: i64::MAX,
        })
    }

    fn request(json: &str) -> CreateOrderRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_client_orders_for_itself() {
        let client = auth(Role::Client);
        let party = order_party(&client, &request(r#"{"items":[]}"#)).unwrap();
        assert_eq!(
            party,
            OrderParty::Client {
                client_id: client.user_id()
            }
        );
    }

    #[test]
    fn test_client_cannot_order_for_others() {
        let client = auth(Role::Client);
        let other = uuid::Uuid::now_v7();
        let err = order_party(
            &client,
            &request(&format!(r#"{{"client_id":"{other}","items":[]}}"#)),
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = order_party(&client, &request(r#"{"status":"completed","items":[]}"#))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_client_cannot_set_prices() {
        let client = auth(Role::Client);
        let product = uuid::Uuid::now_v7();
        let priced = format!(
            r#"{{"client_id":"{}","items":[{{"product_id":"{product}","quantity":1,"price":"0.01"}}]}}"#,
            client.user_id()
        );

        let err = order_party(&client, &request(&priced)).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(order_party(&auth(Role::Admin), &request(&priced)).is_ok());

        let listed = format!(r#"{{"items":[{{"product_id":"{product}","quantity":1}}]}}"#);
        assert!(order_party(&client, &request(&listed)).is_ok());
    }

    #[test]
    fn test_admin_must_name_one_owner() {
        let admin = auth(Role::Admin);
        let err = order_party(&admin, &request(r#"{"items":[]}"#)).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let guest = order_party(
            &admin,
            &request(r#"{"guest":{"name":"Walk-in","email":null,"phone":null},"items":[]}"#),
        )
        .unwrap();
        assert!(matches!(guest, OrderParty::Guest(_)));
    }
}
