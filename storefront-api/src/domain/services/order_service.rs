use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::order::{Order, OrderItem, OrderStatus, round_to_cents, TOTAL_TOLERANCE};
use crate::domain::models::product::Product;
use crate::domain::services::cart_service::CartService;
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::pagination::{Paginated, PaginationParams};

/// One (product, quantity) pair of a proposed order, in request order.
#[derive(Debug, Clone, Copy)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Accumulates line-item snapshots and the authoritative total while the
/// requested products are walked in input order. Pure over already-fetched
/// product rows; all persistence stays in `OrderService`.
#[derive(Debug, Default)]
pub struct OrderDraft {
    items: Vec<OrderItem>,
    total: f64,
}

impl OrderDraft {
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<(), AppError> {
        if !product.has_stock(quantity) {
            return Err(AppError::InsufficientStock(product.name.clone()));
        }

        let item = OrderItem::from_product(product, quantity);
        self.total += item.total;
        self.items.push(item);
        Ok(())
    }

    pub fn total(&self) -> f64 {
        round_to_cents(self.total)
    }

    /// The client echoes the total it displayed; a disagreement beyond the
    /// tolerance means a stale price or a client bug, and aborts the order.
    pub fn verify_client_total(&self, client_total: f64) -> Result<(), AppError> {
        if (self.total() - client_total).abs() > TOTAL_TOLERANCE {
            return Err(AppError::TotalMismatch);
        }
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<OrderItem>, f64) {
        let total = round_to_cents(self.total);
        (self.items, total)
    }
}

pub struct OrderService {
    state: Arc<AppState>,
}

impl OrderService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Places an order as one atomic unit: every product row is locked with
    /// `SELECT ... FOR UPDATE` in input order, stock is decremented behind a
    /// `stock >= ?` guard, and the order row is inserted before the commit.
    /// Any error drops the transaction, rolling back every decrement.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        requested: &[RequestedItem],
        client_total: f64,
        shipping_address: Option<String>,
        payment_method: Option<String>,
    ) -> Result<Order, AppError> {
        if requested.is_empty() {
            return Err(AppError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }

        let mut tx = self.state.db.begin().await?;
        let mut draft = OrderDraft::default();

        for item in requested {
            let product: Product = sqlx::query_as(&format!(
                "SELECT {} FROM products WHERE id = ? AND deleted_at IS NULL FOR UPDATE",
                Product::COLUMNS
            ))
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Product {} not found", item.product_id))
            })?;

            draft.add(&product, item.quantity)?;

            // Re-validates under the row lock; zero rows affected means a
            // concurrent order won the remaining stock.
            let updated = sqlx::query(
                "UPDATE products SET stock = stock - ?, updated_at = ? WHERE id = ? AND stock >= ?",
            )
            .bind(item.quantity)
            .bind(Utc::now())
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(AppError::InsufficientStock(product.name));
            }
        }

        draft.verify_client_total(client_total)?;

        let (items, total) = draft.into_parts();
        let order = Order::new(user_id, items, total, shipping_address, payment_method);

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, items, total_price, status, shipping_address, payment_method, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.items)
        .bind(order.total_price)
        .bind(order.status)
        .bind(&order.shipping_address)
        .bind(&order.payment_method)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // Best-effort side effect outside the atomic unit: the order stands
        // even if clearing the cart fails.
        if let Err(err) = CartService::new(self.state.clone()).clear(user_id).await {
            tracing::warn!(error = %err, user_id = %user_id, "failed to clear cart after order placement");
        }

        tracing::info!(order_id = %order.id, user_id = %user_id, total = order.total_price, "order placed");

        Ok(order)
    }

    /// Cancels an order, restoring stock for every line item in the same
    /// transaction that flips the status. Products that have vanished from
    /// the catalog are skipped; restoration is best-effort per item but the
    /// unit as a whole is atomic.
    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, AppError> {
        let mut tx = self.state.db.begin().await?;

        let mut order: Order = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = ? FOR UPDATE",
            Order::COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.user_id != user_id {
            return Err(AppError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        if !order.status.can_cancel() {
            return Err(AppError::InvalidTransition(
                "order cannot be cancelled at this stage".to_string(),
            ));
        }

        for item in order.items.iter() {
            sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
                .bind(item.quantity)
                .bind(Utc::now())
                .bind(item.product_id)
                .execute(&mut *tx)
                .await?;
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();

        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(order.status)
            .bind(order.updated_at)
            .bind(order.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, user_id = %user_id, "order cancelled");

        Ok(order)
    }

    /// Administrative status update. Any remaining status may be set
    /// directly, including skipping intermediates; only `cancelled` and
    /// `delivered` orders refuse further changes.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, AppError> {
        let mut tx = self.state.db.begin().await?;

        let mut order: Order = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = ? FOR UPDATE",
            Order::COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if !order.status.admin_may_update() {
            return Err(AppError::InvalidTransition(format!(
                "cannot update status of {} orders",
                order.status
            )));
        }

        order.status = new_status;
        order.updated_at = Utc::now();

        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(order.status)
            .bind(order.updated_at)
            .bind(order.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order, AppError> {
        let order: Order = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = ?",
            Order::COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.user_id != user_id {
            return Err(AppError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        Ok(order)
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        pagination: PaginationParams,
    ) -> Result<Paginated<Order>, AppError> {
        let page = pagination.page.unwrap_or(1).max(1);
        let page_size = pagination.page_size.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * page_size;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.state.db)
            .await?;

        let orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
            Order::COLUMNS
        ))
        .bind(user_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.state.db)
        .await?;

        Ok(Paginated {
            items: orders,
            total: total as u64,
            page,
            page_size,
        })
    }

    pub async fn admin_list(
        &self,
        status: Option<OrderStatus>,
        pagination: PaginationParams,
    ) -> Result<Paginated<Order>, AppError> {
        let page = pagination.page.unwrap_or(1).max(1);
        let page_size = pagination.page_size.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * page_size;

        let (total, orders): (i64, Vec<Order>) = match status {
            Some(status) => {
                let total = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?")
                    .bind(status)
                    .fetch_one(&self.state.db)
                    .await?;
                let orders = sqlx::query_as(&format!(
                    "SELECT {} FROM orders WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    Order::COLUMNS
                ))
                .bind(status)
                .bind(page_size)
                .bind(offset)
                .fetch_all(&self.state.db)
                .await?;
                (total, orders)
            }
            None => {
                let total = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
                    .fetch_one(&self.state.db)
                    .await?;
                let orders = sqlx::query_as(&format!(
                    "SELECT {} FROM orders ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    Order::COLUMNS
                ))
                .bind(page_size)
                .bind(offset)
                .fetch_all(&self.state.db)
                .await?;
                (total, orders)
            }
        };

        Ok(Paginated {
            items: orders,
            total: total as u64,
            page,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: f64, stock: i32) -> Product {
        Product::new(name, "", price, stock, None, vec![])
    }

    #[test]
    fn draft_accumulates_snapshots_in_input_order() {
        let a = product("Product A", 10.0, 5);
        let b = product("Product B", 20.0, 2);

        let mut draft = OrderDraft::default();
        draft.add(&a, 2).unwrap();
        draft.add(&b, 2).unwrap();

        assert_eq!(draft.total(), 60.0);
        draft.verify_client_total(60.0).unwrap();

        let (items, total) = draft.into_parts();
        assert_eq!(total, 60.0);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Product A");
        assert_eq!(items[0].total, 20.0);
        assert_eq!(items[1].name, "Product B");
        assert_eq!(items[1].total, 40.0);
    }

    #[test]
    fn draft_rejects_quantity_beyond_stock_naming_the_product() {
        let p = product("Last One", 5.0, 1);
        let mut draft = OrderDraft::default();

        match draft.add(&p, 2) {
            Err(AppError::InsufficientStock(name)) => assert_eq!(name, "Last One"),
            other => panic!("expected InsufficientStock, got {:?}", other.err()),
        }
        assert_eq!(draft.total(), 0.0);
    }

    #[test]
    fn wrong_client_total_is_a_mismatch() {
        let p = product("Keyboard", 29.99, 10);
        let mut draft = OrderDraft::default();
        draft.add(&p, 2).unwrap();

        assert_eq!(draft.total(), 59.98);
        assert!(matches!(
            draft.verify_client_total(10.0),
            Err(AppError::TotalMismatch)
        ));
    }

    #[test]
    fn client_total_within_tolerance_is_accepted() {
        let p = product("Keyboard", 29.99, 10);
        let mut draft = OrderDraft::default();
        draft.add(&p, 2).unwrap();

        draft.verify_client_total(59.98).unwrap();
        draft.verify_client_total(59.975).unwrap();
        assert!(draft.verify_client_total(59.95).is_err());
    }

    #[test]
    fn repeated_products_accumulate_as_separate_lines() {
        let p = product("Widget", 1.5, 10);
        let mut draft = OrderDraft::default();
        draft.add(&p, 1).unwrap();
        draft.add(&p, 3).unwrap();

        let (items, total) = draft.into_parts();
        assert_eq!(items.len(), 2);
        assert_eq!(total, 6.0);
    }
}
