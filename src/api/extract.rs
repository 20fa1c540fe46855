//! Request extractors with JSON error responses

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;

use super::middleware::{extract_session_token, ApiError, AppState};
use crate::models::AdminSession;

/// `axum::Json` whose rejections render as `{ "error": ... }` with status 400
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejections render as `{ "error": ... }`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// A verified admin session
///
/// Taken from the extensions when `require_admin` already ran, otherwise
/// checked here. Handlers that take it reject anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct AdminGuard(pub AdminSession);

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<AdminSession>() {
            return Ok(Self(session.clone()));
        }

        let token = extract_session_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
        let session = state
            .admin_auth
            .get_session(&token)
            .await
            .map_err(|e| ApiError::internal(e, "Internal server error"))?
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        parts.extensions.insert(session.clone());
        Ok(Self(session))
    }
}
