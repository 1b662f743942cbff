//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use crate::{error::ApiError, middleware::api_rate_limit, state::AppState};

pub mod auth;
pub mod cart;
pub mod external;
pub mod orders;
pub mod products;
pub mod upload;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/products", products::router(&state))
        .nest("/auth", auth::router(&state))
        .nest("/cart", cart::router(&state))
        .nest("/orders", orders::router(&state))
        .nest("/upload", upload::router(&state))
        .nest("/external", external::router(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_rate_limit,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .nest("/api", api_routes)
        .fallback(not_found)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Health E-Commerce API with External Integrations",
        "features": ["AI Chatbot", "Kemenkes API", "Midtrans Payment"],
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Readiness check endpoint, verifies database connectivity
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    common::database::health_check(&state.db_pool).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Ready",
    })))
}

/// Envelope-shaped 404 for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_keeps_the_envelope() {
        let response = not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_health_reports_features() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(
            body["message"],
            "Health E-Commerce API with External Integrations"
        );
        assert_eq!(body["features"].as_array().map(Vec::len), Some(3));
        assert!(body["timestamp"].is_string());
    }
}
