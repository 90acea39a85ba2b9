use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::order::round_to_cents;

/// One cart row joined with its live product. Price and stock are the
/// catalog's current values, not snapshots; snapshots happen at order time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: f64,
    pub images: Json<Vec<String>>,
    pub stock: i32,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        round_to_cents(self.price * self.quantity as f64)
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: f64,
    pub cart_count: usize,
}

impl CartView {
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total = round_to_cents(items.iter().map(CartLine::line_total).sum());
        let cart_count = items.len();
        Self {
            items,
            total,
            cart_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: f64, quantity: i32) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            name: "Widget".to_string(),
            price,
            images: Json(vec![]),
            stock: 100,
            quantity,
        }
    }

    #[test]
    fn view_totals_sum_over_lines() {
        let view = CartView::from_lines(vec![line(10.0, 2), line(20.0, 2)]);
        assert_eq!(view.total, 60.0);
        assert_eq!(view.cart_count, 2);
    }

    #[test]
    fn empty_cart_totals_zero() {
        let view = CartView::from_lines(vec![]);
        assert_eq!(view.total, 0.0);
        assert_eq!(view.cart_count, 0);
    }
}
