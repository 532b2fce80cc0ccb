//! Authentication routes for login and the current user.

use axum::{Json, Router, extract::State, routing::{get, post}};
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use kasa_core::auth::verify_password;
use kasa_shared::{
    AppError, Role,
    auth::{LoginRequest, LoginResponse, UserInfo},
};

/// Creates the public auth router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

/// Creates the auth routes that need a valid token.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

fn invalid_credentials() -> ApiError {
    ApiError::new(401, "INVALID_CREDENTIALS", "Invalid email or password")
}

/// POST /auth/login - Authenticate user and return an access token.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Some(user) = state.users().find_by_email(&payload.email).await? else {
        info!(email = %payload.email, "Login attempt for non-existent user");
        return Err(invalid_credentials());
    };

    if !user.is_active {
        return Err(ApiError::new(
            401,
            "ACCOUNT_DISABLED",
            "This account has been disabled",
        ));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(invalid_credentials());
    }

    let role = Role::from(user.role);
    let access_token = state
        .jwt_service
        .generate_access_token(user.id, role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!(user_id = %user.id, role = %role, "User logged in successfully");

    Ok(Json(LoginResponse {
        user: UserInfo {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role,
        },
        access_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    }))
}

/// GET /auth/me - Profile of the authenticated user.
async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserInfo>, ApiError> {
    let model = state
        .users()
        .find_by_id(user.user_id())
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::new(401, "INVALID_TOKEN", "User no longer exists"))?;

    Ok(Json(UserInfo {
        id: model.id,
        email: model.email,
        full_name: model.full_name,
        role: model.role.into(),
    }))
}
