use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::product::Product;
use crate::domain::services::product_service::{ProductFilter, ProductService, ProductSort};
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::pagination::{Paginated, PaginationParams};

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/categories", get(categories))
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: Option<ProductSort>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    pub related_products: Vec<Product>,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Paginated<Product>>, AppError> {
    let product_service = ProductService::new(state.clone());

    let filter = ProductFilter {
        search: query.search,
        category: query.category,
        min_price: query.min_price,
        max_price: query.max_price,
        sort: query.sort,
    };
    let pagination = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    };

    let products = product_service.list_products(&filter, pagination).await?;

    Ok(Json(products))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetailResponse>, AppError> {
    let product_service = ProductService::new(state.clone());

    let product = product_service.get_product(id).await?;
    let related_products = product_service.related_products(&product).await?;

    Ok(Json(ProductDetailResponse {
        product,
        related_products,
    }))
}

async fn categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    let product_service = ProductService::new(state.clone());

    let categories = product_service.categories().await?;

    Ok(Json(categories))
}
