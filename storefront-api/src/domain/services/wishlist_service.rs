use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::product::Product;
use crate::error::AppError;
use crate::server::AppState;

pub struct WishlistService {
    state: Arc<AppState>,
}

impl WishlistService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<Product>, AppError> {
        // Product must exist in the live catalog
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(product_id)
        .fetch_one(&self.state.db)
        .await?;

        if exists == 0 {
            return Err(AppError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        if self.contains(user_id, product_id).await? {
            return Err(AppError::BadRequest(
                "Product already in wishlist".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO wishlist_items (id, user_id, product_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.state.db)
        .await?;

        self.list(user_id).await
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Product>, AppError> {
        let products: Vec<Product> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM wishlist_items w
            JOIN products p ON p.id = w.product_id AND p.deleted_at IS NULL
            WHERE w.user_id = ?
            ORDER BY w.created_at DESC
            "#,
            prefixed_product_columns()
        ))
        .bind(user_id)
        .fetch_all(&self.state.db)
        .await?;

        Ok(products)
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<Product>, AppError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = ? AND product_id = ?")
                .bind(user_id)
                .bind(product_id)
                .execute(&self.state.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BadRequest("Product not in wishlist".to_string()));
        }

        self.list(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.state.db)
            .await?;

        Ok(())
    }

    pub async fn contains(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wishlist_items WHERE user_id = ? AND product_id = ?",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.state.db)
        .await?;

        Ok(count > 0)
    }
}

/// `Product::COLUMNS` with each column qualified by the join alias.
fn prefixed_product_columns() -> String {
    Product::COLUMNS
        .split(", ")
        .map(|column| format!("p.{}", column))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_columns_qualify_every_column() {
        let prefixed = prefixed_product_columns();
        assert!(prefixed.starts_with("p.id, p.name"));
        assert_eq!(
            prefixed.matches("p.").count(),
            Product::COLUMNS.split(", ").count()
        );
    }
}
