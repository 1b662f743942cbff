//! Product model, catalog queries and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Product category, a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_category")]
pub enum Category {
    Vitamin,
    Supplement,
    #[sqlx(rename = "Medical Equipment")]
    #[serde(rename = "Medical Equipment")]
    MedicalEquipment,
    Medicine,
    Other,
}

impl Category {
    /// Parse a category name as it appears on the wire
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Vitamin" => Some(Category::Vitamin),
            "Supplement" => Some(Category::Supplement),
            "Medical Equipment" => Some(Category::MedicalEquipment),
            "Medicine" => Some(Category::Medicine),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Product entity
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    /// Whole rupiah
    pub price: i64,
    pub stock: i32,
    pub manufacturer: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sort order for product listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    #[default]
    Newest,
}

impl ProductSort {
    /// Parse the `sort` query parameter; unknown values fall back to newest
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("price-asc") => ProductSort::PriceAsc,
            Some("price-desc") => ProductSort::PriceDesc,
            Some("name-asc") => ProductSort::NameAsc,
            Some("name-desc") => ProductSort::NameDesc,
            _ => ProductSort::Newest,
        }
    }
}

/// New product row
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub price: i64,
    pub stock: i32,
    pub manufacturer: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

/// Partial product update; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub manufacturer: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

// Request types

/// Catalog listing filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// Create/update payload; accepted as JSON body or multipart text fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub manufacturer: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

// Response types

/// Paginated catalog listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub page: u32,
    pub total_pages: i64,
    pub limit: u32,
    pub data: Vec<Product>,
}

/// Page count for a listing: ceil(total / limit), 0 when the set is empty
pub fn total_pages(total: i64, limit: u32) -> i64 {
    let limit = i64::from(limit.max(1));
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Vitamin"), Some(Category::Vitamin));
        assert_eq!(
            Category::parse("Medical Equipment"),
            Some(Category::MedicalEquipment)
        );
        assert_eq!(Category::parse("vitamin"), None);
        assert_eq!(Category::parse("All"), None);
    }

    #[test]
    fn test_category_wire_name_has_space() {
        let json = serde_json::to_value(Category::MedicalEquipment).unwrap();
        assert_eq!(json, "Medical Equipment");
    }

    #[test]
    fn test_sort_from_param() {
        assert_eq!(
            ProductSort::from_param(Some("price-asc")),
            ProductSort::PriceAsc
        );
        assert_eq!(
            ProductSort::from_param(Some("name-desc")),
            ProductSort::NameDesc
        );
        assert_eq!(ProductSort::from_param(Some("garbage")), ProductSort::Newest);
        assert_eq!(ProductSort::from_param(None), ProductSort::Newest);
    }

    #[test]
    fn test_total_pages_math() {
        assert_eq!(total_pages(0, 12), 0);
        assert_eq!(total_pages(1, 12), 1);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        // 12 items at 5 per page span 3 pages
        assert_eq!(total_pages(12, 5), 3);
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Vitamin C 500mg".to_string(),
            description: None,
            category: Category::Vitamin,
            price: 45000,
            stock: 20,
            manufacturer: Some("Sido Muncul".to_string()),
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["isActive"], true);
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("image_url").is_none());
    }
}
