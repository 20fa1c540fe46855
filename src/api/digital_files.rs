//! Digital artwork file endpoints (admin only)
//!
//! Upload takes multipart/form-data with a single file field `digitalFile`.
//! Messages are in Dutch, as shown in the back office.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::extract::{AdminGuard, ApiPath};
use super::middleware::{ApiError, AppState};
use crate::models::Artwork;
use crate::services::{ArtworkServiceError, DigitalFileError};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
    pub artwork: Artwork,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub message: &'static str,
    pub artwork: Artwork,
}

fn into_api_error(err: ArtworkServiceError, failure: &str) -> ApiError {
    match err {
        ArtworkServiceError::NotFound(_) => ApiError::not_found("Kunstwerk niet gevonden"),
        ArtworkServiceError::NoDigitalFile(_) => {
            ApiError::not_found("Digitaal bestand niet gevonden")
        }
        ArtworkServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        ArtworkServiceError::DigitalFile(
            e @ (DigitalFileError::TypeNotAllowed | DigitalFileError::TooLarge(_)),
        ) => ApiError::validation_error(e.to_string()),
        ArtworkServiceError::DigitalFile(e @ DigitalFileError::Missing) => {
            ApiError::not_found(e.to_string())
        }
        other => ApiError::internal(other, failure),
    }
}

/// POST /api/artworks/{id}/upload-digital
pub async fn upload_digital_file(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    const FAILURE: &str = "Fout bij uploaden van digitaal bestand";
    const NO_FILE: &str = "Geen bestand geüpload";

    // Not a multipart body at all: nothing was uploaded
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e.body_text());
        ApiError::validation_error(NO_FILE)
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::validation_error(state.digital_files.too_large().to_string())
        } else {
            ApiError::validation_error(e.body_text())
        }
    })? {
        if field.name() != Some("digitalFile") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::validation_error(state.digital_files.too_large().to_string())
            } else {
                ApiError::internal(e, FAILURE)
            }
        })?;

        let (filename, artwork) = state
            .artwork_service
            .attach_digital_file(&id, &original_name, &content_type, &data)
            .await
            .map_err(|e| into_api_error(e, FAILURE))?;

        return Ok(Json(UploadResponse {
            message: "Digitale bestand succesvol geüpload",
            filename,
            artwork,
        }));
    }

    Err(ApiError::validation_error(NO_FILE))
}

/// GET /api/artworks/{id}/digital-file
pub async fn download_digital_file(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, ApiError> {
    let download = state
        .artwork_service
        .digital_file(&id)
        .await
        .map_err(|e| into_api_error(e, "Fout bij downloaden van digitaal bestand"))?;

    Ok((
        [
            (header::CONTENT_TYPE, download.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.file_name),
            ),
        ],
        download.data,
    )
        .into_response())
}

/// DELETE /api/artworks/{id}/digital-file
pub async fn delete_digital_file(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let artwork = state
        .artwork_service
        .remove_digital_file(&id)
        .await
        .map_err(|e| into_api_error(e, "Fout bij verwijderen van digitaal bestand"))?;

    Ok(Json(RemoveResponse {
        message: "Digitaal bestand succesvol verwijderd",
        artwork,
    }))
}
