//! Registration, login and profile routes

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::info;

use crate::{
    error::ApiError,
    jwt::Claims,
    middleware::auth_middleware,
    models::{
        AuthData, LoginRequest, NewUser, RegisterRequest, UpdateProfileRequest, UpdateUser,
        UserResponse,
    },
    state::AppState,
    validation,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

/// Register a new customer account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_name(&payload.name).map_err(ApiError::BadRequest)?;
    validation::validate_email(&payload.email).map_err(ApiError::BadRequest)?;
    validation::validate_password(&payload.password).map_err(ApiError::BadRequest)?;

    let email = payload.email.trim().to_lowercase();

    if state.user_repository.find_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let new_user = NewUser {
        name: payload.name.trim().to_string(),
        email,
        password_hash: hash_password(&payload.password)?,
    };
    let user = state.user_repository.create(&new_user).await?;

    let token = state
        .jwt_service
        .generate_token(&user)
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))?;

    info!("User registered: {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": AuthData {
                token,
                user: UserResponse::from(user),
            },
        })),
    ))
}

/// Log in with email and password
///
/// Unknown email and wrong password answer with the same message, so the
/// endpoint does not leak which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .user_repository
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = state
        .jwt_service
        .generate_token(&user)
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))?;

    info!("User logged in: {}", user.email);

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "data": AuthData {
            token,
            user: UserResponse::from(user),
        },
    })))
}

/// Current user's profile with a cart summary
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let cart_item_count = state.cart_repository.count_items(claims.sub).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "user": UserResponse::from(user),
            "cartItemCount": cart_item_count,
        },
    })))
}

/// Update name, email or password for the current user
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut changes = UpdateUser::default();

    if let Some(ref name) = payload.name {
        validation::validate_name(name).map_err(ApiError::BadRequest)?;
        changes.name = Some(name.trim().to_string());
    }

    if let Some(ref email) = payload.email {
        validation::validate_email(email).map_err(ApiError::BadRequest)?;
        let email = email.trim().to_lowercase();

        if let Some(existing) = state.user_repository.find_by_email(&email).await? {
            if existing.id != claims.sub {
                return Err(ApiError::BadRequest("Email already registered".to_string()));
            }
        }
        changes.email = Some(email);
    }

    if let Some(ref password) = payload.password {
        validation::validate_password(password).map_err(ApiError::BadRequest)?;
        changes.password_hash = Some(hash_password(password)?);
    }

    let user = state
        .user_repository
        .update_profile(claims.sub, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": UserResponse::from(user),
    })))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
