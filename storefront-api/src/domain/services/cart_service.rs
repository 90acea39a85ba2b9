use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::cart::{CartLine, CartView};
use crate::domain::models::product::Product;
use crate::error::AppError;
use crate::server::AppState;

pub struct CartService {
    state: Arc<AppState>,
}

impl CartService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Adds a product to the user's cart. Quantities for a product already
    /// in the cart merge, clamped to the live stock.
    pub async fn add(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<CartView, AppError> {
        let product = self.fetch_product(product_id).await?;

        if !product.has_stock(quantity) {
            return Err(AppError::InsufficientStock(product.name));
        }

        let existing: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE user_id = ? AND product_id = ?",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.state.db)
        .await?;

        match existing {
            Some(current) => {
                let merged = (current + quantity as i32).min(product.stock);
                sqlx::query(
                    "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE user_id = ? AND product_id = ?",
                )
                .bind(merged)
                .bind(Utc::now())
                .bind(user_id)
                .bind(product_id)
                .execute(&self.state.db)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO cart_items (id, user_id, product_id, quantity, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(product_id)
                .bind(quantity)
                .bind(Utc::now())
                .bind(Utc::now())
                .execute(&self.state.db)
                .await?;
            }
        }

        self.view(user_id).await
    }

    /// The cart joined with live catalog rows. Items whose product has been
    /// removed from the catalog drop out of the view.
    pub async fn view(&self, user_id: Uuid) -> Result<CartView, AppError> {
        let lines: Vec<CartLine> = sqlx::query_as(
            r#"
            SELECT c.product_id, p.name, p.price, p.images, p.stock, c.quantity
            FROM cart_items c
            JOIN products p ON p.id = c.product_id AND p.deleted_at IS NULL
            WHERE c.user_id = ?
            ORDER BY c.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.state.db)
        .await?;

        Ok(CartView::from_lines(lines))
    }

    /// Sets the quantity of a product already in the cart.
    pub async fn update(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: u32,
    ) -> Result<CartView, AppError> {
        let product = self.fetch_product(product_id).await?;

        if !product.has_stock(quantity) {
            return Err(AppError::InsufficientStock(product.name));
        }

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE user_id = ? AND product_id = ?",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(user_id)
        .bind(product_id)
        .execute(&self.state.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product not found in cart".to_string()));
        }

        self.view(user_id).await
    }

    /// Removing a product that is not in the cart is a no-op.
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView, AppError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.state.db)
            .await?;

        self.view(user_id).await
    }

    /// Discards every cart row for the user. Also the post-order side effect
    /// invoked by the order processor.
    pub async fn clear(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.state.db)
            .await?;

        Ok(())
    }

    async fn fetch_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = ? AND deleted_at IS NULL",
            Product::COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))
    }
}
