use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::domain::models::product::Product;

/// Allowed disagreement between the client-supplied total and the total
/// recomputed from live prices.
pub const TOTAL_TOLERANCE: f64 = 0.01;

pub const DEFAULT_PAYMENT_METHOD: &str = "cash_on_delivery";

/// Order lifecycle. `pending → processing → shipped → delivered`, with
/// cancellation possible from `pending` and `processing` only. `shipped`,
/// `delivered` and `cancelled` are terminal for cancellation; administrators
/// are refused updates once an order is `cancelled` or `delivered`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// A customer may cancel only before the order has shipped.
    pub fn can_cancel(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Administrators may move an order to any status until it is
    /// cancelled or delivered.
    pub fn admin_may_update(self) -> bool {
        !matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered)
    }
}

/// Snapshot of one ordered product taken at order-creation time. Name and
/// price are never re-synced with the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub total: f64,
}

impl OrderItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity,
            total: round_to_cents(product.price * quantity as f64),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<OrderItem>>,
    pub total_price: f64,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Column list matching the struct's field order, for runtime `query_as`.
    pub const COLUMNS: &'static str =
        "id, user_id, items, total_price, status, shipping_address, payment_method, created_at, updated_at";

    pub fn new(
        user_id: Uuid,
        items: Vec<OrderItem>,
        total_price: f64,
        shipping_address: Option<String>,
        payment_method: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: Json(items),
            total_price,
            status: OrderStatus::Pending,
            shipping_address,
            payment_method: payment_method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: f64, stock: i32) -> Product {
        Product::new(name, "", price, stock, None, vec![])
    }

    #[test]
    fn status_round_trips_through_strings() {
        for (status, text) in [
            (OrderStatus::Pending, "pending"),
            (OrderStatus::Processing, "processing"),
            (OrderStatus::Shipped, "shipped"),
            (OrderStatus::Delivered, "delivered"),
            (OrderStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(status.to_string(), text);
            assert_eq!(text.parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_pending_and_processing_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn admin_updates_refused_once_cancelled_or_delivered() {
        assert!(OrderStatus::Pending.admin_may_update());
        assert!(OrderStatus::Processing.admin_may_update());
        assert!(OrderStatus::Shipped.admin_may_update());
        assert!(!OrderStatus::Delivered.admin_may_update());
        assert!(!OrderStatus::Cancelled.admin_may_update());
    }

    #[test]
    fn line_item_snapshots_product_and_computes_total() {
        let p = product("Mechanical Keyboard", 59.99, 10);
        let item = OrderItem::from_product(&p, 2);

        assert_eq!(item.product_id, p.id);
        assert_eq!(item.name, "Mechanical Keyboard");
        assert_eq!(item.price, 59.99);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.total, 119.98);
    }

    #[test]
    fn line_total_is_rounded_to_cents() {
        let p = product("Sticker", 0.10, 100);
        let item = OrderItem::from_product(&p, 3);
        assert_eq!(item.total, 0.30);
    }

    #[test]
    fn new_order_defaults_to_pending_cash_on_delivery() {
        let p = product("Widget", 10.0, 5);
        let items = vec![OrderItem::from_product(&p, 1)];
        let order = Order::new(Uuid::new_v4(), items, 10.0, None, None);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, "cash_on_delivery");
        assert_eq!(order.total_price, 10.0);
        assert_eq!(order.items.len(), 1);
    }
}
