//! File upload routes backed by the object storage adapter
//!
//! Uploads are multipart with a single `image` field. Size and content
//! type are enforced per preset before anything touches storage.

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    middleware,
    response::IntoResponse,
    routing::{delete, post},
};
use serde_json::json;
use tracing::warn;

use crate::{
    error::ApiError,
    jwt::Claims,
    middleware::{auth_middleware, require_admin},
    models::UserResponse,
    services::storage::{self, StoredObject, UploadPreset},
    state::AppState,
};

/// Fits the largest preset plus multipart overhead
const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/product", post(upload_product_image))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .merge(admin_routes)
        .route("/profile", post(upload_profile_photo))
        .route("/*public_id", delete(delete_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route_layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Store a product image (admin)
pub async fn upload_product_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let file = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let filename = file.filename.clone();
    let stored = store_checked(&state, UploadPreset::Product, file).await?;

    Ok(Json(json!({
        "success": true,
        "message": "File uploaded successfully",
        "imageUrl": stored.url,
        "filename": filename,
        "publicId": stored.key,
    })))
}

/// Store a profile photo for the current user, replacing any previous one
pub async fn upload_profile_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let file = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let filename = file.filename.clone();
    let stored = store_checked(&state, UploadPreset::Profile, file).await?;

    let updated = state
        .user_repository
        .set_profile_photo(claims.sub, &stored.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    // Drop the replaced photo only after the row points at the new one
    if let Some(ref old_url) = user.profile_photo {
        if let Some(key) = state.storage.key_from_url(old_url) {
            if let Err(e) = state.storage.delete(&key).await {
                warn!("Failed to delete previous profile photo {}: {}", key, e);
            }
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "Profile photo updated",
        "imageUrl": stored.url,
        "filename": filename,
        "publicId": stored.key,
        "user": UserResponse::from(updated),
    })))
}

/// Delete a stored object by its key
pub async fn delete_file(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .storage
        .delete(&public_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to delete file: {}", e)))?;

    Ok(Json(json!({
        "success": true,
        "message": "File deleted successfully",
    })))
}

/// One uploaded file pulled out of a multipart payload
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Read the `image` field from a multipart payload, if present
pub async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
            .to_vec();

        return Ok(Some(UploadedFile {
            filename,
            content_type,
            bytes,
        }));
    }

    Ok(None)
}

/// Enforce content type and size for the preset, then store
pub async fn store_checked(
    state: &AppState,
    preset: UploadPreset,
    file: UploadedFile,
) -> Result<StoredObject, ApiError> {
    if !storage::is_allowed_content_type(&file.content_type) {
        return Err(ApiError::BadRequest(
            "Only image files are allowed".to_string(),
        ));
    }

    if file.bytes.len() > preset.max_bytes() {
        return Err(ApiError::BadRequest(format!(
            "File too large (max {}MB)",
            preset.max_bytes() / (1024 * 1024)
        )));
    }

    state
        .storage
        .upload(preset, &file.filename, &file.content_type, file.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("File upload failed: {}", e)))
}
