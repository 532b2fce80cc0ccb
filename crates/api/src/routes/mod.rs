//! API route definitions.

use axum::{Router, middleware};
use serde::Deserialize;

use crate::{AppState, middleware::auth::auth_middleware};
use kasa_shared::PageRequest;

pub mod auth;
pub mod dashboard;
pub mod debt;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

/// Creates the API router with public routes only.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(auth::routes())
}

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(users::routes())
        .merge(products::routes())
        .merge(orders::routes())
        .merge(debt::routes())
        .merge(dashboard::routes())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    // Combine public and protected routes
    api_routes().merge(protected_routes)
}

/// Builds a normalized page from optional `page` / `per_page` query values.
pub(crate) fn page_request(page: Option<u32>, per_page: Option<u32>) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest {
        page: page.unwrap_or(defaults.page),
        per_page: per_page.unwrap_or(defaults.per_page),
    }
    .normalized()
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
