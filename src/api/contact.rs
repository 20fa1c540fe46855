//! Contact form endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use super::extract::ApiJson;
use super::middleware::{ApiError, AppState};
use crate::models::ContactInput;
use crate::services::ContactServiceError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /api/contact
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    let submission = state.contact_service.create(input).await.map_err(|e| match e {
        ContactServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        other => ApiError::internal(other, "Internal server error. Please try again later."),
    })?;

    let email = state.email_service.clone();
    tokio::spawn(async move {
        if let Err(e) = email.send_contact_notification(&submission).await {
            tracing::error!("Failed to send contact notification: {:#}", e);
        }
    });

    Ok(Json(MessageResponse {
        message: "Contact form submitted successfully",
    }))
}
