//! Order history routes; orders are created by the payment flow

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::{
    error::ApiError,
    jwt::Claims,
    middleware::auth_middleware,
    models::{OrderListResponse, OrderQuery, OrderStatus, total_pages},
    state::AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:order_id", get(get_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}

/// Current user's orders, newest first
///
/// An unrecognized `status` value is ignored rather than rejected.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).min(100).max(1);
    let status = query.status.as_deref().and_then(OrderStatus::parse);

    let (data, total) = state
        .order_repository
        .list_for_user(claims.sub, status, page, limit)
        .await?;

    Ok(Json(OrderListResponse {
        success: true,
        count: data.len(),
        total,
        page,
        total_pages: total_pages(total, limit),
        data,
    }))
}

/// One order by its public reference, scoped to the current user
pub async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .order_repository
        .find_for_user(&order_id, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": order,
    })))
}
