use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::order::Order;
use crate::domain::services::order_service::{OrderService, RequestedItem};
use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;
use crate::utils::pagination::{Paginated, PaginationParams};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order))
        .route("/", get(order_history))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", put(cancel_order))
}

#[derive(Debug, Deserialize, serde::Serialize, Validate)]
pub struct OrderItemRequest {
    pub id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"), nested)]
    pub items: Vec<OrderItemRequest>,
    #[validate(range(min = 0.0, message = "Total price must be non-negative"))]
    pub total_price: f64,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let requested: Vec<RequestedItem> = payload
        .items
        .iter()
        .map(|item| RequestedItem {
            product_id: item.id,
            quantity: item.quantity,
        })
        .collect();

    let order_service = OrderService::new(state.clone());
    let order = order_service
        .place_order(
            user.id,
            &requested,
            payload.total_price,
            payload.shipping_address,
            payload.payment_method,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

async fn order_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<Paginated<Order>>, AppError> {
    let order_service = OrderService::new(state.clone());

    let orders = order_service.history(user.id, pagination).await?;

    Ok(Json(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order_service = OrderService::new(state.clone());

    let order = order_service.get_order(user.id, id).await?;

    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order_service = OrderService::new(state.clone());

    let order = order_service.cancel_order(user.id, id).await?;

    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: Vec<OrderItemRequest>, total: f64) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items,
            total_price: total,
            shipping_address: None,
            payment_method: None,
        }
    }

    #[test]
    fn empty_item_list_fails_validation() {
        assert!(request(vec![], 0.0).validate().is_err());
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let req = request(
            vec![OrderItemRequest {
                id: Uuid::new_v4(),
                quantity: 0,
            }],
            10.0,
        );
        assert!(req.validate().is_err());
    }

    #[test]
    fn negative_total_fails_validation() {
        let req = request(
            vec![OrderItemRequest {
                id: Uuid::new_v4(),
                quantity: 1,
            }],
            -1.0,
        );
        assert!(req.validate().is_err());
    }

    #[test]
    fn well_formed_request_passes_validation() {
        let req = request(
            vec![OrderItemRequest {
                id: Uuid::new_v4(),
                quantity: 2,
            }],
            59.98,
        );
        assert!(req.validate().is_ok());
    }
}
