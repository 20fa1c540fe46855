//! Newsletter endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use super::extract::ApiJson;
use super::middleware::{ApiError, AppState};
use crate::models::SubscribeInput;
use crate::services::NewsletterServiceError;

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: &'static str,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub message: &'static str,
    pub unsubscribed: bool,
}

fn into_api_error(err: NewsletterServiceError) -> ApiError {
    match err {
        NewsletterServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        NewsletterServiceError::StorageConfiguration(ref cause)
        | NewsletterServiceError::StorageConnection(ref cause) => {
            tracing::error!("Newsletter storage error: {:#}", cause);
            ApiError::internal_error(err.to_string())
        }
        NewsletterServiceError::InternalError(cause) => {
            ApiError::internal(format!("{:#}", cause), "Internal server error")
        }
    }
}

/// POST /api/newsletter
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SubscribeInput>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let subscription = state
        .newsletter_service
        .subscribe(input.email.as_deref(), input.name.as_deref())
        .await
        .map_err(into_api_error)?;

    let email = state.email_service.clone();
    let to = subscription.email.clone();
    let name = subscription.name.clone();
    tokio::spawn(async move {
        if let Err(e) = email.send_newsletter_confirmation(&to, name.as_deref()).await {
            tracing::error!("Failed to send newsletter confirmation: {:#}", e);
        }
    });

    Ok(Json(SubscribeResponse {
        message: "Successfully subscribed to newsletter",
        email: subscription.email,
    }))
}

/// POST /api/newsletter/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SubscribeInput>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let unsubscribed = state
        .newsletter_service
        .unsubscribe(input.email.as_deref())
        .await
        .map_err(into_api_error)?;

    Ok(Json(UnsubscribeResponse {
        message: if unsubscribed {
            "Successfully unsubscribed from newsletter"
        } else {
            "Email address is not subscribed"
        },
        unsubscribed,
    }))
}
