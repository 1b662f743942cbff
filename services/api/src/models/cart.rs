//! Cart models and payloads
//!
//! Cart lines reference products by id; the stored row never copies
//! product data. Views join against the catalog at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::product::Category;

/// Cart line joined with its product, as served to clients
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    /// Product id, kept under `_id` for frontend compatibility
    #[serde(rename = "_id")]
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub category: Category,
    pub stock: i32,
    pub image_url: Option<String>,
    pub manufacturer: Option<String>,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

// Request types

/// Add-to-cart payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
}

/// Absolute quantity update
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: Option<i32>,
}

// Response types

/// Cart view with its running total
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub success: bool,
    pub count: usize,
    pub cart_total: i64,
    pub data: Vec<CartItemView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_view_wire_shape() {
        let view = CartItemView {
            product_id: Uuid::new_v4(),
            name: "Vitamin C 500mg".to_string(),
            price: 45000,
            category: Category::Vitamin,
            stock: 10,
            image_url: None,
            manufacturer: None,
            quantity: 2,
            added_at: Utc::now(),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("productId").is_none());
        assert!(json.get("addedAt").is_some());
        assert_eq!(json["quantity"], 2);
    }
}
