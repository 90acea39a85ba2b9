use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::order::{Order, OrderStatus};
use crate::domain::models::product::Product;
use crate::domain::models::user::User;
use crate::domain::services::admin_service::{AdminService, DashboardReport};
use crate::domain::services::order_service::OrderService;
use crate::domain::services::product_service::{ProductService, StockUpdate};
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;
use crate::utils::pagination::{Paginated, PaginationParams};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        // 产品管理
        .route("/products", post(create_product))
        .route("/products/low-stock", get(low_stock_products))
        .route("/products/stock", put(bulk_update_stock))
        .route("/products/{id}", put(update_product))
        .route("/products/{id}", delete(delete_product))
        // 订单管理
        .route("/orders", get(list_orders))
        .route("/orders/{id}/status", put(update_order_status))
        // 用户管理
        .route("/users", get(list_users))
        .route("/users/{id}/status", put(update_user_status))
        .route("/users/{id}", delete(delete_user))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub description: String,
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: f64,
    #[validate(range(min = 0, message = "Stock must be non-negative"))]
    pub stock: i32,
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "Stock must be non-negative"))]
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkStockRequest {
    pub updates: Vec<StockUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub is_admin: bool,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardReport>, AppError> {
    let admin_service = AdminService::new(state.clone());

    let report = admin_service.dashboard().await?;

    Ok(Json(report))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.clone());
    let product = product_service
        .create_product(
            &payload.name,
            &payload.description,
            payload.price,
            payload.stock,
            payload.category,
            payload.images,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product_service = ProductService::new(state.clone());
    let product = product_service
        .update_product(
            id,
            payload.name,
            payload.description,
            payload.price,
            payload.stock,
            payload.category,
            payload.images,
        )
        .await?;

    Ok(Json(product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<(), AppError> {
    let product_service = ProductService::new(state.clone());

    product_service.delete_product(id).await?;

    Ok(())
}

async fn low_stock_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LowStockQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let product_service = ProductService::new(state.clone());

    let products = product_service
        .low_stock(query.threshold.unwrap_or(5))
        .await?;

    Ok(Json(products))
}

async fn bulk_update_stock(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkStockRequest>,
) -> Result<(), AppError> {
    if payload.updates.is_empty() {
        return Err(AppError::Validation(
            "Updates must contain at least one entry".to_string(),
        ));
    }
    if payload.updates.iter().any(|update| update.stock < 0) {
        return Err(AppError::Validation(
            "Stock must be non-negative".to_string(),
        ));
    }

    let product_service = ProductService::new(state.clone());
    product_service.bulk_update_stock(&payload.updates).await?;

    Ok(())
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<Json<Paginated<Order>>, AppError> {
    let order_service = OrderService::new(state.clone());

    let pagination = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    };
    let orders = order_service.admin_list(query.status, pagination).await?;

    Ok(Json(orders))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order_service = OrderService::new(state.clone());

    let order = order_service.update_status(id, payload.status).await?;

    Ok(Json(order))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Paginated<User>>, AppError> {
    let admin_service = AdminService::new(state.clone());

    let pagination = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    };
    let users = admin_service.users(query.search, pagination).await?;

    Ok(Json(users))
}

async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> Result<Json<User>, AppError> {
    let admin_service = AdminService::new(state.clone());

    let user = admin_service
        .update_user_status(current.id, id, payload.is_admin)
        .await?;

    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<(), AppError> {
    let admin_service = AdminService::new(state.clone());

    admin_service.delete_user(current.id, id).await?;

    Ok(())
}
