//! Request middleware: bearer auth, role guard, rate limiting

use axum::{
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::jwt::{AuthTokenError, Claims};
use crate::models::Role;
use crate::state::AppState;

/// Authentication middleware
///
/// Expects `Authorization: Bearer <token>`. Structurally broken tokens are
/// rejected before signature verification so the client gets a precise
/// message instead of a generic validation failure.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Access denied. No token provided.".to_string()))?
        .to_string();

    if !has_jwt_shape(&token) {
        return Err(ApiError::Forbidden(
            "Invalid token format. Token must be a valid JWT with 3 parts separated by dots \
             (header.payload.signature). Please login again to get a new token."
                .to_string(),
        ));
    }

    let claims = state
        .jwt_service
        .validate_token(&token)
        .map_err(|e| match e {
            AuthTokenError::Expired => {
                ApiError::Forbidden("Token expired. Please login again.".to_string())
            }
            AuthTokenError::Malformed => ApiError::Forbidden(
                "Token format is invalid. Please login again to get a new token.".to_string(),
            ),
            AuthTokenError::InvalidSignature | AuthTokenError::Other(_) => {
                ApiError::Forbidden("Invalid token".to_string())
            }
        })?;

    // Make the claims available to handlers downstream
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// A structurally plausible JWT has exactly three dot-separated segments
fn has_jwt_shape(token: &str) -> bool {
    token.split('.').count() == 3
}

/// Role guard for admin-only routes; layered after `auth_middleware`
pub async fn require_admin(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let is_admin = req
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.role == Role::Admin)
        .unwrap_or(false);

    if !is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}

/// Global rate limit applied to the whole /api scope
pub async fn api_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.api_limiter.is_allowed(&addr.ip().to_string()).await {
        return Err(ApiError::TooManyRequests(
            "Too many requests. Please try again later.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Stricter limit for the AI routes, applied on top of the global one
pub async fn ai_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.ai_limiter.is_allowed(&addr.ip().to_string()).await {
        return Err(ApiError::TooManyRequests(
            "Too many AI requests. Please wait.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
