//! User management routes.
//!
//! Admins manage every account. A client may read its own record.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{nullable, page_request};
use crate::{AppState, error::ApiError, middleware::AuthUser};
use kasa_core::auth::{hash_password, validate_password_strength};
use kasa_db::entities::users;
use kasa_db::repositories::{CreateUserInput, UpdateUserInput, UserFilter};
use kasa_shared::{PageResponse, Role, types::UserId};

/// Creates the users router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Filter by role.
    pub role: Option<Role>,
    /// Substring of name or email.
    pub search: Option<String>,
    /// Page number.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Request body for creating a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Login email.
    pub email: String,
    /// Plain password, hashed before storage.
    pub password: String,
    /// Display name.
    pub full_name: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Role, clients by default.
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Client
}

/// Request body for updating a user. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// New email.
    pub email: Option<String>,
    /// New password.
    pub password: Option<String>,
    /// New display name.
    pub full_name: Option<String>,
    /// New phone; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    /// New company; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub company: Option<Option<String>>,
    /// Enable or disable login.
    pub is_active: Option<bool>,
}

/// A user without credentials.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// ID.
    pub id: Uuid,
    /// Email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Phone number.
    pub phone: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Role.
    pub role: Role,
    /// Whether login is allowed.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(m: users::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            full_name: m.full_name,
            phone: m.phone,
            company: m.company,
            role: m.role.into(),
            is_active: m.is_active,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::validation(format!("Invalid email: {email}"))),
    }
}

/// GET /users - List users.
async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PageResponse<UserResponse>>, ApiError> {
    user.require_admin()?;
    let filter = UserFilter {
        role: query.role,
        search: query.search,
    };
    let page = state
        .users()
        .list(&filter, page_request(query.page, query.per_page))
        .await?;
    Ok(Json(page.map(UserResponse::from)))
}

/// POST /users - Create a user.
async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    user.require_admin()?;
    validate_email(&payload.email)?;
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::validation("Full name is required"));
    }
    validate_password_strength(&payload.password)?;

    let created = state
        .users()
        .create(CreateUserInput {
            email: payload.email,
            password_hash: hash_password(&payload.password)?,
            full_name: payload.full_name,
            phone: payload.phone,
            company: payload.company,
            role: payload.role,
        })
        .await?;

    info!(user_id = %created.id, created_by = %user.user_id(), "User account created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /users/{id} - Fetch one user.
async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    user.require_view(id)?;
    let found = state
        .users()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::new(404, "USER_NOT_FOUND", format!("User not found: {id}")))?;
    Ok(Json(found.into()))
}

/// PATCH /users/{id} - Update a user.
async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<UserId>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    user.require_admin()?;
    if let Some(email) = payload.email.as_deref() {
        validate_email(email)?;
    }
    if payload.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::validation("Full name cannot be empty"));
    }
    let password_hash = match payload.password.as_deref() {
        Some(password) => {
            validate_password_strength(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let updated = state
        .users()
        .update(
            id,
            UpdateUserInput {
                email: payload.email,
                password_hash,
                full_name: payload.full_name,
                phone: payload.phone,
                company: payload.company,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

/// DELETE /users/{id} - Delete a client account.
async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;
    state.users().delete(id).await?;
    info!(user_id = %id, deleted_by = %user.user_id(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email(" ana@example.com ").is_ok());
        assert!(validate_email("ana.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@localhost").is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let absent: UpdateUserRequest = serde_json::from_str(r#"{"full_name":"Ana"}"#).unwrap();
        assert_eq!(absent.phone, None);

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"phone":null}"#).unwrap();
        assert_eq!(cleared.phone, Some(None));

        let set: UpdateUserRequest = serde_json::from_str(r#"{"company":"Kasa"}"#).unwrap();
        assert_eq!(set.company, Some(Some("Kasa".to_string())));
    }

    #[test]
    fn test_create_defaults_to_client() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"email":"a@b.mk","password":"longenough","full_name":"A"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Client);
    }
}
