//! Admin API endpoints
//!
//! Handles HTTP requests for the back office:
//! - Login, logout and session check (public, under `/api/admin`)
//! - Dashboard statistics
//! - Order, newsletter and contact listings
//! - Contact submission status changes

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use super::extract::{AdminGuard, ApiJson, ApiPath};
use super::middleware::{extract_session_token, ApiError, AppState};
use crate::models::{
    ContactSubmission, NewsletterSubscription, OrderRequest, SessionInfo,
    UpdateContactStatusInput,
};
use crate::services::{AdminAuthError, ContactService, ContactServiceError, DashboardStats};

/// Login request body. Anything but a string password counts as missing.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "crate::models::string_or_none")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub authenticated: bool,
    /// Expiry as Unix epoch milliseconds
    pub expires_at: i64,
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<SessionInfo>, ApiError> {
    let session = state
        .admin_auth
        .login(body.password.as_deref())
        .await
        .map_err(|e| match e {
            AdminAuthError::PasswordRequired => ApiError::validation_error(e.to_string()),
            AdminAuthError::InvalidPassword => ApiError::unauthorized(e.to_string()),
            other => ApiError::internal(other, "Internal server error"),
        })?;
    Ok(Json(session.info()))
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state
            .admin_auth
            .logout(&token)
            .await
            .map_err(|e| ApiError::internal(e, "Internal server error"))?;
    }
    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

/// GET /api/admin/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let session = match extract_session_token(&headers) {
        Some(token) => state
            .admin_auth
            .get_session(&token)
            .await
            .map_err(|e| ApiError::internal(e, "Internal server error"))?,
        None => None,
    };
    let session = session.ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    Ok(Json(MeResponse {
        authenticated: true,
        expires_at: session.expires_at.timestamp_millis(),
    }))
}

/// GET /api/admin/dashboard
pub async fn dashboard(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    state
        .dashboard_service
        .stats()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(format!("{:#}", e), "Internal server error"))
}

/// GET /api/admin/orders
pub async fn list_orders(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderRequest>>, ApiError> {
    state
        .order_service
        .list()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e, "Internal server error"))
}

/// GET /api/admin/newsletter
pub async fn list_newsletter(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsletterSubscription>>, ApiError> {
    state
        .newsletter_service
        .list_all()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e, "Internal server error"))
}

/// GET /api/admin/contact
pub async fn list_contact(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    state
        .contact_service
        .list()
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e, "Internal server error"))
}

fn contact_error(err: ContactServiceError) -> ApiError {
    match err {
        ContactServiceError::NotFound(_) => ApiError::not_found("Contact submission not found"),
        ContactServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        other => ApiError::internal(other, "Internal server error"),
    }
}

/// Submission ids are numeric; anything else cannot exist
fn contact_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("Contact submission not found"))
}

/// PUT /api/admin/contact/{id}/status
///
/// The status is checked before the id, so a bad status is a 400 even for an
/// unknown submission.
pub async fn update_contact_status(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateContactStatusInput>,
) -> Result<Json<ContactSubmission>, ApiError> {
    ContactService::parse_status(body.status.as_deref()).map_err(contact_error)?;
    let id = contact_id(&id)?;
    state
        .contact_service
        .update_status(id, body.status.as_deref())
        .await
        .map(Json)
        .map_err(contact_error)
}

/// PUT /api/admin/contact/{id}/read
pub async fn mark_contact_read(
    _admin: AdminGuard,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ContactSubmission>, ApiError> {
    let id = contact_id(&id)?;
    state
        .contact_service
        .mark_as_read(id)
        .await
        .map(Json)
        .map_err(contact_error)
}
