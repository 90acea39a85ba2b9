use chrono::Utc;
use serde::Deserialize;
use sqlx::{MySql, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::product::Product;
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::pagination::{Paginated, PaginationParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    Newest,
}

impl ProductSort {
    fn order_clause(self) -> &'static str {
        match self {
            ProductSort::PriceAsc => "price ASC",
            ProductSort::PriceDesc => "price DESC",
            ProductSort::NameAsc => "name ASC",
            ProductSort::NameDesc => "name DESC",
            ProductSort::Newest => "created_at DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: Option<ProductSort>,
}

/// Absolute stock level for one product, used by the bulk admin update.
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub id: Uuid,
    pub stock: i32,
}

pub struct ProductService {
    state: Arc<AppState>,
}

impl ProductService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: PaginationParams,
    ) -> Result<Paginated<Product>, AppError> {
        let page = pagination.page.unwrap_or(1).max(1);
        let page_size = pagination.page_size.unwrap_or(12).clamp(1, 100);
        let offset = (page - 1) * page_size;

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.state.db)
            .await?;

        let mut query =
            QueryBuilder::new(format!("SELECT {} FROM products", Product::COLUMNS));
        push_filters(&mut query, filter);
        query.push(" ORDER BY ");
        query.push(filter.sort.unwrap_or(ProductSort::Newest).order_clause());
        query.push(" LIMIT ");
        query.push_bind(page_size);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let products: Vec<Product> = query
            .build_query_as()
            .fetch_all(&self.state.db)
            .await?;

        Ok(Paginated {
            items: products,
            total: total as u64,
            page,
            page_size,
        })
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        let product: Product = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = ? AND deleted_at IS NULL",
            Product::COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found", id)))?;

        Ok(product)
    }

    /// Up to four other products from the same category, for the detail page.
    pub async fn related_products(&self, product: &Product) -> Result<Vec<Product>, AppError> {
        let Some(category) = &product.category else {
            return Ok(Vec::new());
        };

        let related: Vec<Product> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE category = ? AND id != ? AND deleted_at IS NULL LIMIT 4",
            Product::COLUMNS
        ))
        .bind(category)
        .bind(product.id)
        .fetch_all(&self.state.db)
        .await?;

        Ok(related)
    }

    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM products WHERE category IS NOT NULL AND deleted_at IS NULL ORDER BY category",
        )
        .fetch_all(&self.state.db)
        .await?;

        Ok(categories)
    }

    pub async fn create_product(
        &self,
        name: &str,
        description: &str,
        price: f64,
        stock: i32,
        category: Option<String>,
        images: Vec<String>,
    ) -> Result<Product, AppError> {
        let product = Product::new(name, description, price, stock, category, images);

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, images, stock, category, deleted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.images)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.state.db)
        .await?;

        tracing::info!(product_id = %product.id, "product created");

        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        price: Option<f64>,
        stock: Option<i32>,
        category: Option<String>,
        images: Option<Vec<String>>,
    ) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;

        if let Some(new_name) = name {
            product.name = new_name;
        }
        if let Some(new_description) = description {
            product.description = new_description;
        }
        if let Some(new_price) = price {
            product.price = new_price;
        }
        if let Some(new_stock) = stock {
            product.stock = new_stock;
        }
        if let Some(new_category) = category {
            product.category = Some(new_category);
        }
        if let Some(new_images) = images {
            product.images = sqlx::types::Json(new_images);
        }
        product.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, price = ?, images = ?, stock = ?, category = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.images)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.updated_at)
        .bind(product.id)
        .execute(&self.state.db)
        .await?;

        Ok(product)
    }

    /// Soft delete. Historical orders keep their line-item snapshots and
    /// cancellation can still restore stock onto the hidden row.
    pub async fn delete_product(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.state.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Product with ID {} not found",
                id
            )));
        }

        tracing::info!(product_id = %id, "product soft-deleted");

        Ok(())
    }

    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>, AppError> {
        let products: Vec<Product> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE stock < ? AND deleted_at IS NULL ORDER BY stock ASC",
            Product::COLUMNS
        ))
        .bind(threshold)
        .fetch_all(&self.state.db)
        .await?;

        Ok(products)
    }

    /// Absolute stock overwrite for a batch of products, in one transaction.
    pub async fn bulk_update_stock(&self, updates: &[StockUpdate]) -> Result<(), AppError> {
        let mut tx = self.state.db.begin().await?;

        for update in updates {
            let result =
                sqlx::query("UPDATE products SET stock = ?, updated_at = ? WHERE id = ?")
                    .bind(update.stock)
                    .bind(Utc::now())
                    .bind(update.id)
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!(
                    "Product with ID {} not found",
                    update.id
                )));
            }
        }

        tx.commit().await?;

        Ok(())
    }
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, MySql>, filter: &ProductFilter) {
    query.push(" WHERE deleted_at IS NULL");

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query.push(" AND (name LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(category) = &filter.category {
        query.push(" AND category = ");
        query.push_bind(category.clone());
    }

    if let Some(min_price) = filter.min_price {
        query.push(" AND price >= ");
        query.push_bind(min_price);
    }

    if let Some(max_price) = filter.max_price {
        query.push(" AND price <= ");
        query.push_bind(max_price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_modes_map_to_order_clauses() {
        assert_eq!(ProductSort::PriceAsc.order_clause(), "price ASC");
        assert_eq!(ProductSort::PriceDesc.order_clause(), "price DESC");
        assert_eq!(ProductSort::NameAsc.order_clause(), "name ASC");
        assert_eq!(ProductSort::NameDesc.order_clause(), "name DESC");
        assert_eq!(ProductSort::Newest.order_clause(), "created_at DESC");
    }

    #[test]
    fn filters_compose_into_sql() {
        let filter = ProductFilter {
            search: Some("keyboard".into()),
            category: Some("electronics".into()),
            min_price: Some(10.0),
            max_price: Some(100.0),
            sort: None,
        };

        let mut query: QueryBuilder<MySql> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut query, &filter);
        let sql = query.sql();

        assert!(sql.contains("deleted_at IS NULL"));
        assert!(sql.contains("name LIKE"));
        assert!(sql.contains("description LIKE"));
        assert!(sql.contains("category ="));
        assert!(sql.contains("price >="));
        assert!(sql.contains("price <="));
    }

    #[test]
    fn empty_filter_only_excludes_deleted_rows() {
        let mut query: QueryBuilder<MySql> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut query, &ProductFilter::default());
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM products WHERE deleted_at IS NULL");
    }
}
