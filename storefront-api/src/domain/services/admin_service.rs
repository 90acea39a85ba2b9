use serde::Serialize;
use sqlx::types::Json;
use sqlx::{MySql, QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::order::{Order, OrderItem, OrderStatus};
use crate::domain::models::user::User;
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::pagination::{Paginated, PaginationParams};

const LOW_STOCK_THRESHOLD: i32 = 5;
const DASHBOARD_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_users: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_revenue: f64,
    pub low_stock_products: i64,
}

/// Sales volume of one product, aggregated from delivered orders' line-item
/// snapshots. Name comes from the snapshot, so removed products still show.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: u64,
    pub order_count: u64,
}

#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub stats: DashboardStats,
    pub recent_orders: Vec<Order>,
    pub top_products: Vec<TopProduct>,
}

pub struct AdminService {
    state: Arc<AppState>,
}

impl AdminService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn dashboard(&self) -> Result<DashboardReport, AppError> {
        let db = &self.state.db;

        let total_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(db)
                .await?;
        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin = FALSE")
                .fetch_one(db)
                .await?;
        let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db)
            .await?;
        let pending_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?")
                .bind(OrderStatus::Pending)
                .fetch_one(db)
                .await?;
        let total_revenue: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_price), 0) FROM orders WHERE status = ?",
        )
        .bind(OrderStatus::Delivered)
        .fetch_one(db)
        .await?;
        let low_stock_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE stock < ? AND deleted_at IS NULL",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(db)
        .await?;

        let recent_orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {} FROM orders ORDER BY created_at DESC LIMIT ?",
            Order::COLUMNS
        ))
        .bind(DASHBOARD_LIMIT as u64)
        .fetch_all(db)
        .await?;

        let delivered_items: Vec<Json<Vec<OrderItem>>> =
            sqlx::query_scalar("SELECT items FROM orders WHERE status = ?")
                .bind(OrderStatus::Delivered)
                .fetch_all(db)
                .await?;

        let top_products = top_sellers(
            delivered_items.into_iter().map(|items| items.0),
            DASHBOARD_LIMIT,
        );

        Ok(DashboardReport {
            stats: DashboardStats {
                total_products,
                total_users,
                total_orders,
                pending_orders,
                total_revenue,
                low_stock_products,
            },
            recent_orders,
            top_products,
        })
    }

    pub async fn users(
        &self,
        search: Option<String>,
        pagination: PaginationParams,
    ) -> Result<Paginated<User>, AppError> {
        let page = pagination.page.unwrap_or(1).max(1);
        let page_size = pagination.page_size.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * page_size;

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_search(&mut count_query, &search);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.state.db)
            .await?;

        let mut query = QueryBuilder::new(
            "SELECT id, name, email, password_hash, is_admin, created_at, updated_at FROM users",
        );
        push_user_search(&mut query, &search);
        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(page_size);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let users: Vec<User> = query.build_query_as().fetch_all(&self.state.db).await?;

        Ok(Paginated {
            items: users,
            total: total as u64,
            page,
            page_size,
        })
    }

    /// Grants or revokes admin privileges. An admin cannot demote themselves
    /// while they are the only admin left.
    pub async fn update_user_status(
        &self,
        acting_admin: Uuid,
        target_id: Uuid,
        is_admin: bool,
    ) -> Result<User, AppError> {
        let mut user = self.fetch_user(target_id).await?;

        if !is_admin && user.is_admin && acting_admin == user.id {
            let admin_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin = TRUE")
                    .fetch_one(&self.state.db)
                    .await?;
            if admin_count <= 1 {
                return Err(AppError::BadRequest(
                    "Cannot remove admin privileges from the only admin user".to_string(),
                ));
            }
        }

        user.is_admin = is_admin;
        user.updated_at = chrono::Utc::now();

        sqlx::query("UPDATE users SET is_admin = ?, updated_at = ? WHERE id = ?")
            .bind(user.is_admin)
            .bind(user.updated_at)
            .bind(user.id)
            .execute(&self.state.db)
            .await?;

        Ok(user)
    }

    /// Deletes a user. Admins cannot delete themselves, and the last admin
    /// cannot be deleted by anyone.
    pub async fn delete_user(&self, acting_admin: Uuid, target_id: Uuid) -> Result<(), AppError> {
        let user = self.fetch_user(target_id).await?;

        if acting_admin == user.id {
            return Err(AppError::BadRequest(
                "Cannot delete your own account".to_string(),
            ));
        }

        if user.is_admin {
            let admin_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin = TRUE")
                    .fetch_one(&self.state.db)
                    .await?;
            if admin_count <= 1 {
                return Err(AppError::BadRequest(
                    "Cannot delete the only admin user".to_string(),
                ));
            }
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user.id)
            .execute(&self.state.db)
            .await?;

        tracing::info!(user_id = %target_id, admin_id = %acting_admin, "user deleted");

        Ok(())
    }

    async fn fetch_user(&self, id: Uuid) -> Result<User, AppError> {
        sqlx::query_as(
            "SELECT id, name, email, password_hash, is_admin, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

fn push_user_search(query: &mut QueryBuilder<'_, MySql>, search: &Option<String>) {
    if let Some(search) = search {
        let pattern = format!("%{}%", search);
        query.push(" WHERE (name LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR email LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}

/// Aggregates line-item snapshots into per-product sales volume and returns
/// the `limit` best sellers, most units first.
fn top_sellers(
    orders_items: impl IntoIterator<Item = Vec<OrderItem>>,
    limit: usize,
) -> Vec<TopProduct> {
    let mut by_product: HashMap<Uuid, TopProduct> = HashMap::new();

    for items in orders_items {
        for item in items {
            let entry = by_product
                .entry(item.product_id)
                .or_insert_with(|| TopProduct {
                    product_id: item.product_id,
                    name: item.name.clone(),
                    units_sold: 0,
                    order_count: 0,
                });
            entry.units_sold += item.quantity as u64;
            entry.order_count += 1;
        }
    }

    let mut top: Vec<TopProduct> = by_product.into_values().collect();
    top.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then(a.name.cmp(&b.name)));
    top.truncate(limit);
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::product::Product;

    fn items(pairs: &[(&Product, u32)]) -> Vec<OrderItem> {
        pairs
            .iter()
            .map(|(product, quantity)| OrderItem::from_product(product, *quantity))
            .collect()
    }

    #[test]
    fn top_sellers_rank_by_units_sold() {
        let a = Product::new("Product A", "", 10.0, 100, None, vec![]);
        let b = Product::new("Product B", "", 20.0, 100, None, vec![]);

        let orders = vec![
            items(&[(&a, 1), (&b, 5)]),
            items(&[(&a, 2)]),
        ];

        let top = top_sellers(orders, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Product B");
        assert_eq!(top[0].units_sold, 5);
        assert_eq!(top[0].order_count, 1);
        assert_eq!(top[1].name, "Product A");
        assert_eq!(top[1].units_sold, 3);
        assert_eq!(top[1].order_count, 2);
    }

    #[test]
    fn top_sellers_respects_the_limit() {
        let products: Vec<Product> = (0..10)
            .map(|i| Product::new(&format!("P{}", i), "", 1.0, 10, None, vec![]))
            .collect();
        let order: Vec<OrderItem> = products
            .iter()
            .map(|product| OrderItem::from_product(product, 1))
            .collect();

        let top = top_sellers(vec![order], 5);
        assert_eq!(top.len(), 5);
    }

    #[test]
    fn no_delivered_orders_means_no_top_sellers() {
        assert!(top_sellers(Vec::<Vec<OrderItem>>::new(), 5).is_empty());
    }
}
