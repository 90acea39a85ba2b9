use axum::{
    extract::{Extension, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::user::User;
use crate::domain::services::auth_service::AuthService;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/user", get(current_user))
        .route("/profile", put(update_profile))
        .route("/account", delete(delete_account))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_service = AuthService::new(state.clone());
    let result = auth_service
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse {
        access_token: result.access_token,
        token_type: "Bearer".to_string(),
        expires_in: result.expires_in,
        user: result.user.into(),
    }))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_service = AuthService::new(state.clone());
    let result = auth_service.login(&payload.email, &payload.password).await?;

    Ok(Json(AuthResponse {
        access_token: result.access_token,
        token_type: "Bearer".to_string(),
        expires_in: result.expires_in,
        user: result.user.into(),
    }))
}

/// Tokens are stateless; logging out is the client discarding its token.
async fn logout(Extension(user): Extension<CurrentUser>) -> Result<(), AppError> {
    tracing::debug!(user_id = %user.id, "user logged out");
    Ok(())
}

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, AppError> {
    let auth_service = AuthService::new(state.clone());
    // CurrentUser only carries id and role; return the full profile
    let user = auth_service.get_user(user.id).await?;

    Ok(Json(user.into()))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_service = AuthService::new(state.clone());
    let updated = auth_service
        .update_profile(user.id, payload.name, payload.email, payload.password)
        .await?;

    Ok(Json(updated.into()))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<(), AppError> {
    let auth_service = AuthService::new(state.clone());
    auth_service.delete_account(user.id).await?;

    Ok(())
}
