use axum::{
    extract::{Extension, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::product::Product;
use crate::domain::services::wishlist_service::WishlistService;
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/add", post(add_to_wishlist))
        .route("/", get(get_wishlist))
        .route("/remove", delete(remove_from_wishlist))
        .route("/clear", delete(clear_wishlist))
        .route("/check/{product_id}", get(check_wishlist))
}

#[derive(Debug, Deserialize)]
pub struct WishlistItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub products: Vec<Product>,
    pub count: usize,
}

impl From<Vec<Product>> for WishlistResponse {
    fn from(products: Vec<Product>) -> Self {
        let count = products.len();
        Self { products, count }
    }
}

#[derive(Debug, Serialize)]
pub struct WishlistCheckResponse {
    pub in_wishlist: bool,
}

async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<WishlistItemRequest>,
) -> Result<Json<WishlistResponse>, AppError> {
    let wishlist_service = WishlistService::new(state.clone());

    let products = wishlist_service.add(user.id, payload.product_id).await?;

    Ok(Json(products.into()))
}

async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<WishlistResponse>, AppError> {
    let wishlist_service = WishlistService::new(state.clone());

    let products = wishlist_service.list(user.id).await?;

    Ok(Json(products.into()))
}

async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<WishlistItemRequest>,
) -> Result<Json<WishlistResponse>, AppError> {
    let wishlist_service = WishlistService::new(state.clone());

    let products = wishlist_service.remove(user.id, payload.product_id).await?;

    Ok(Json(products.into()))
}

async fn clear_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<WishlistResponse>, AppError> {
    let wishlist_service = WishlistService::new(state.clone());

    wishlist_service.clear(user.id).await?;

    Ok(Json(Vec::new().into()))
}

async fn check_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<WishlistCheckResponse>, AppError> {
    let wishlist_service = WishlistService::new(state.clone());

    let in_wishlist = wishlist_service.contains(user.id, product_id).await?;

    Ok(Json(WishlistCheckResponse { in_wishlist }))
}
