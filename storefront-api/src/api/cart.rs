use axum::{
    extract::{Extension, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::cart::CartView;
use crate::domain::services::cart_service::CartService;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/add", post(add_to_cart))
        .route("/", get(get_cart))
        .route("/update", put(update_cart))
        .route("/remove", delete(remove_from_cart))
        .route("/clear", delete(clear_cart))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveCartItemRequest {
    pub product_id: Uuid,
}

async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Json<CartView>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let cart_service = CartService::new(state.clone());
    let cart = cart_service
        .add(user.id, payload.product_id, payload.quantity)
        .await?;

    Ok(Json(cart))
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<CartView>, AppError> {
    let cart_service = CartService::new(state.clone());

    let cart = cart_service.view(user.id).await?;

    Ok(Json(cart))
}

async fn update_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Json<CartView>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let cart_service = CartService::new(state.clone());
    let cart = cart_service
        .update(user.id, payload.product_id, payload.quantity)
        .await?;

    Ok(Json(cart))
}

async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<RemoveCartItemRequest>,
) -> Result<Json<CartView>, AppError> {
    let cart_service = CartService::new(state.clone());

    let cart = cart_service.remove(user.id, payload.product_id).await?;

    Ok(Json(cart))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<CartView>, AppError> {
    let cart_service = CartService::new(state.clone());

    cart_service.clear(user.id).await?;
    let cart = cart_service.view(user.id).await?;

    Ok(Json(cart))
}
