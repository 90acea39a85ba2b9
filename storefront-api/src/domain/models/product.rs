use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub images: Json<Vec<String>>,
    pub stock: i32,
    pub category: Option<String>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Column list matching the struct's field order, for runtime `query_as`.
    pub const COLUMNS: &'static str =
        "id, name, description, price, images, stock, category, deleted_at, created_at, updated_at";

    pub fn new(
        name: &str,
        description: &str,
        price: f64,
        stock: i32,
        category: Option<String>,
        images: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            images: Json(images),
            stock,
            category,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Whether the live stock covers the requested quantity.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= 0 && self.stock as u32 >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32) -> Product {
        Product::new("Widget", "A widget", 9.99, stock, None, vec![])
    }

    #[test]
    fn has_stock_checks_requested_quantity() {
        assert!(product(5).has_stock(5));
        assert!(product(5).has_stock(1));
        assert!(!product(5).has_stock(6));
        assert!(!product(0).has_stock(1));
    }
}
