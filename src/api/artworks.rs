//! Artwork API endpoints
//!
//! Mounted at `/api/artworks` (reads public, writes admin-only) and at
//! `/api/admin/artworks` (everything admin-only).

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::digital_files;
use super::extract::{AdminGuard, ApiJson, ApiPath};
use super::middleware::{ApiError, AppState};
use crate::models::{Artwork, ArtworkPatch, CreateArtworkInput};
use crate::services::ArtworkServiceError;

/// Headroom on top of the file limit for multipart framing
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Build the artworks router
pub fn router(state: &AppState) -> Router<AppState> {
    let body_limit = (state.digital_files.max_file_size() + MULTIPART_OVERHEAD) as usize;

    Router::new()
        .route("/", get(list_artworks).post(create_artwork))
        .route(
            "/{id}",
            get(get_artwork).put(update_artwork).delete(delete_artwork),
        )
        .route(
            "/{id}/upload-digital",
            post(digital_files::upload_digital_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/{id}/digital-file",
            get(digital_files::download_digital_file).delete(digital_files::delete_digital_file),
        )
}

fn into_api_error(err: ArtworkServiceError) -> ApiError {
    match err {
        ArtworkServiceError::NotFound(_) => ApiError::not_found("Artwork not found"),
        ArtworkServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        other => ApiError::internal(other, "Internal server error"),
    }
}

/// GET /api/artworks
async fn list_artworks(State(state): State<AppState>) -> Result<Json<Vec<Artwork>>, ApiError> {
    state
        .artwork_service
        .list()
        .await
        .map(Json)
        .map_err(into_api_error)
}

/// GET /api/artworks/{id}
async fn get_artwork(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Artwork>, ApiError> {
    state
        .artwork_service
        .get(&id)
        .await
        .map_err(into_api_error)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Artwork not found"))
}

/// POST /api/artworks
async fn create_artwork(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateArtworkInput>,
) -> Result<(StatusCode, Json<Artwork>), ApiError> {
    let artwork = state
        .artwork_service
        .create(input)
        .await
        .map_err(into_api_error)?;
    Ok((StatusCode::CREATED, Json(artwork)))
}

/// PUT /api/artworks/{id}
async fn update_artwork(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ArtworkPatch>,
) -> Result<Json<Artwork>, ApiError> {
    state
        .artwork_service
        .update(&id, patch)
        .await
        .map(Json)
        .map_err(into_api_error)
}

/// DELETE /api/artworks/{id}
async fn delete_artwork(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    state
        .artwork_service
        .delete(&id)
        .await
        .map_err(into_api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
