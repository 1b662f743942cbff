//! Cart routes; every route requires an authenticated user
//!
//! Stock is checked at add/update time only and never reserved; the cart
//! view re-resolves products on every read.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiError,
    jwt::Claims,
    middleware::auth_middleware,
    models::{AddToCartRequest, CartItemView, CartResponse, UpdateCartRequest},
    state::AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route(
            "/:product_id",
            axum::routing::put(update_cart_item).delete(remove_from_cart),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}

/// Cart view joined with the catalog, plus the running total
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.cart_repository.get_view(claims.sub).await?;

    Ok(Json(CartResponse {
        success: true,
        count: data.len(),
        cart_total: cart_total(&data),
        data,
    }))
}

/// Sum of price times quantity over the resolved view
fn cart_total(items: &[CartItemView]) -> i64 {
    items
        .iter()
        .map(|item| item.price * i64::from(item.quantity))
        .sum()
}

/// Add a product to the cart; a repeated add sums the quantity
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = payload
        .product_id
        .ok_or_else(|| ApiError::BadRequest("Product ID is required".to_string()))?;

    let quantity = payload.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product = state
        .product_repository
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    if !product.is_active {
        return Err(ApiError::BadRequest("Product is not active".to_string()));
    }
    if quantity > product.stock {
        return Err(ApiError::BadRequest("Insufficient stock".to_string()));
    }

    state
        .cart_repository
        .add(claims.sub, product_id, quantity)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Product added to cart",
    })))
}

/// Set an absolute quantity for a cart line
pub async fn update_cart_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quantity = payload.quantity.unwrap_or(0);
    if quantity < 1 {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    if state
        .cart_repository
        .find_quantity(claims.sub, product_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Product not found in cart".to_string()));
    }

    if let Some(product) = state.product_repository.find_by_id(product_id).await? {
        if quantity > product.stock {
            return Err(ApiError::BadRequest(format!(
                "Insufficient stock. Available: {}",
                product.stock
            )));
        }
    }

    state
        .cart_repository
        .set_quantity(claims.sub, product_id, quantity)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Cart updated",
    })))
}

/// Remove one product from the cart
pub async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.cart_repository.remove(claims.sub, product_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Product removed from cart",
    })))
}

/// Empty the cart
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.cart_repository.clear(claims.sub).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Cart cleared",
    })))
}
