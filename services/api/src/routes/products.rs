//! Product catalog routes
//!
//! Listing and detail are public; mutations require an admin token. Create
//! and update accept either a JSON body or a multipart form with an
//! optional `image` file stored through the upload adapter.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::{auth_middleware, require_admin},
    models::{
        Category, NewProduct, ProductInput, ProductListResponse, ProductQuery, ProductSort,
        UpdateProduct, total_pages,
    },
    repositories::CatalogFilters,
    routes::upload::{UploadedFile, store_checked},
    services::storage::UploadPreset,
    state::AppState,
};

/// Multipart payloads carry up to a 5 MiB image plus form overhead
const PRODUCT_BODY_LIMIT: usize = 6 * 1024 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", axum::routing::post(create_product))
        .route(
            "/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route_layer(DefaultBodyLimit::max(PRODUCT_BODY_LIMIT));

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .merge(admin_routes)
}

/// List active products with filters, sorting and pagination
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(12).min(100).max(1);
    let sort = ProductSort::from_param(query.sort.as_deref());

    let category = match query.category.as_deref() {
        None | Some("All") => None,
        Some(value) => match Category::parse(value) {
            Some(category) => Some(category),
            // An unknown category matches nothing
            None => {
                return Ok(Json(ProductListResponse {
                    success: true,
                    count: 0,
                    total: 0,
                    page,
                    total_pages: 0,
                    limit,
                    data: Vec::new(),
                }));
            }
        },
    };

    let filters = CatalogFilters {
        category,
        min_price: query.min_price,
        max_price: query.max_price,
        search: query.search.clone(),
    };

    let (data, total) = state
        .product_repository
        .list(&filters, sort, page, limit)
        .await?;

    Ok(Json(ProductListResponse {
        success: true,
        count: data.len(),
        total,
        page,
        total_pages: total_pages(total, limit),
        limit,
        data,
    }))
}

/// Product detail; inactive products stay reachable by id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .product_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": product,
    })))
}

/// Create a product (admin)
pub async fn create_product(
    State(state): State<AppState>,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    let (input, image) = parse_product_payload(req).await?;

    let mut new_product = build_new_product(input)?;
    if let Some(image) = image {
        let stored = store_checked(&state, UploadPreset::Product, image).await?;
        new_product.image_url = Some(stored.url);
    }

    let product = state.product_repository.create(&new_product).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product created successfully",
            "data": product,
        })),
    ))
}

/// Partially update a product (admin)
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .product_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let (input, image) = parse_product_payload(req).await?;

    let mut changes = build_product_changes(input)?;
    if let Some(image) = image {
        let stored = store_checked(&state, UploadPreset::Product, image).await?;
        changes.image_url = Some(stored.url);
    }

    let product = state
        .product_repository
        .update(id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    // Drop the replaced image only after the row points at the new one
    if changes.image_url.is_some() {
        delete_stored_image(&state, existing.image_url.as_deref()).await;
    }

    Ok(Json(json!({
        "success": true,
        "message": "Product updated successfully",
        "data": product,
    })))
}

/// Hard-delete a product (admin); captured order lines keep their copies
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .product_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    if !state.product_repository.delete(id).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }

    delete_stored_image(&state, existing.image_url.as_deref()).await;

    Ok(Json(json!({
        "success": true,
        "message": "Product deleted successfully",
        "data": {},
    })))
}

/// Accept the payload as multipart form data or a plain JSON body
async fn parse_product_payload(
    req: Request,
) -> Result<(ProductInput, Option<UploadedFile>), ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        let Json(input) = Json::<ProductInput>::from_request(req, &())
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        return Ok((input, None));
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?;

    let mut input = ProductInput::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                    .to_vec();
                image = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "name" => input.name = Some(read_text(field).await?),
            "description" => input.description = Some(read_text(field).await?),
            "category" => input.category = Some(read_text(field).await?),
            "manufacturer" => input.manufacturer = Some(read_text(field).await?),
            "imageUrl" => input.image_url = Some(read_text(field).await?),
            "price" => {
                let text = read_text(field).await?;
                input.price = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::BadRequest("Invalid price value".to_string()))?,
                );
            }
            "stock" => {
                let text = read_text(field).await?;
                input.stock = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::BadRequest("Invalid stock value".to_string()))?,
                );
            }
            "isActive" => {
                let text = read_text(field).await?;
                input.is_active = Some(matches!(text.trim(), "true" | "1"));
            }
            _ => {}
        }
    }

    Ok((input, image))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))
}

fn build_new_product(input: ProductInput) -> Result<NewProduct, ApiError> {
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?
        .to_string();

    let category = input
        .category
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Category is required".to_string()))?;
    let category = Category::parse(category)
        .ok_or_else(|| ApiError::BadRequest("Invalid category".to_string()))?;

    let price = input
        .price
        .ok_or_else(|| ApiError::BadRequest("Price is required".to_string()))?;
    if price < 0 {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }

    let stock = input
        .stock
        .ok_or_else(|| ApiError::BadRequest("Stock is required".to_string()))?;
    if stock < 0 {
        return Err(ApiError::BadRequest("Stock cannot be negative".to_string()));
    }

    Ok(NewProduct {
        name,
        description: input.description,
        category,
        price,
        stock,
        manufacturer: input.manufacturer,
        image_url: input.image_url,
        is_active: input.is_active.unwrap_or(true),
    })
}

fn build_product_changes(input: ProductInput) -> Result<UpdateProduct, ApiError> {
    let name = match input.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::BadRequest("Name cannot be empty".to_string()));
            }
            Some(name)
        }
        None => None,
    };

    let category = match input.category.as_deref() {
        Some(value) => Some(
            Category::parse(value)
                .ok_or_else(|| ApiError::BadRequest("Invalid category".to_string()))?,
        ),
        None => None,
    };

    if matches!(input.price, Some(price) if price < 0) {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }
    if matches!(input.stock, Some(stock) if stock < 0) {
        return Err(ApiError::BadRequest("Stock cannot be negative".to_string()));
    }

    Ok(UpdateProduct {
        name,
        description: input.description,
        category,
        price: input.price,
        stock: input.stock,
        manufacturer: input.manufacturer,
        image_url: input.image_url,
        is_active: input.is_active,
    })
}

/// Best-effort removal of a previously stored image
async fn delete_stored_image(state: &AppState, image_url: Option<&str>) {
    let Some(url) = image_url else {
        return;
    };
    let Some(key) = state.storage.key_from_url(url) else {
        return;
    };

    if let Err(e) = state.storage.delete(&key).await {
        warn!("Failed to delete stored image {}: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_requires_name_category_price_stock() {
        let missing_name = build_new_product(ProductInput {
            category: Some("Vitamin".to_string()),
            price: Some(1000),
            stock: Some(5),
            ..ProductInput::default()
        });
        assert!(matches!(missing_name, Err(ApiError::BadRequest(ref m)) if m == "Name is required"));

        let missing_category = build_new_product(ProductInput {
            name: Some("Vitamin C".to_string()),
            price: Some(1000),
            stock: Some(5),
            ..ProductInput::default()
        });
        assert!(
            matches!(missing_category, Err(ApiError::BadRequest(ref m)) if m == "Category is required")
        );

        let missing_price = build_new_product(ProductInput {
            name: Some("Vitamin C".to_string()),
            category: Some("Vitamin".to_string()),
            stock: Some(5),
            ..ProductInput::default()
        });
        assert!(matches!(missing_price, Err(ApiError::BadRequest(ref m)) if m == "Price is required"));
    }

    #[test]
    fn test_new_product_rejects_unknown_category_and_negatives() {
        let bad_category = build_new_product(ProductInput {
            name: Some("Vitamin C".to_string()),
            category: Some("Snacks".to_string()),
            price: Some(1000),
            stock: Some(5),
            ..ProductInput::default()
        });
        assert!(matches!(bad_category, Err(ApiError::BadRequest(ref m)) if m == "Invalid category"));

        let negative_price = build_new_product(ProductInput {
            name: Some("Vitamin C".to_string()),
            category: Some("Vitamin".to_string()),
            price: Some(-1),
            stock: Some(5),
            ..ProductInput::default()
        });
        assert!(
            matches!(negative_price, Err(ApiError::BadRequest(ref m)) if m == "Price cannot be negative")
        );

        let negative_stock = build_new_product(ProductInput {
            name: Some("Vitamin C".to_string()),
            category: Some("Vitamin".to_string()),
            price: Some(1000),
            stock: Some(-1),
            ..ProductInput::default()
        });
        assert!(
            matches!(negative_stock, Err(ApiError::BadRequest(ref m)) if m == "Stock cannot be negative")
        );
    }

    #[test]
    fn test_new_product_defaults_to_active() {
        let product = build_new_product(ProductInput {
            name: Some("  Vitamin C  ".to_string()),
            category: Some("Vitamin".to_string()),
            price: Some(45000),
            stock: Some(20),
            ..ProductInput::default()
        })
        .unwrap();

        assert_eq!(product.name, "Vitamin C");
        assert_eq!(product.category, Category::Vitamin);
        assert!(product.is_active);
    }

    #[test]
    fn test_changes_reject_blank_name() {
        let result = build_product_changes(ProductInput {
            name: Some("   ".to_string()),
            ..ProductInput::default()
        });
        assert!(matches!(result, Err(ApiError::BadRequest(ref m)) if m == "Name cannot be empty"));
    }

    #[test]
    fn test_changes_pass_through_partial_fields() {
        let changes = build_product_changes(ProductInput {
            price: Some(50000),
            is_active: Some(false),
            ..ProductInput::default()
        })
        .unwrap();

        assert_eq!(changes.price, Some(50000));
        assert_eq!(changes.is_active, Some(false));
        assert!(changes.name.is_none());
        assert!(changes.category.is_none());
    }
}
