//! Order request endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::extract::ApiJson;
use super::middleware::{ApiError, AppState};
use crate::models::{CreateOrderInput, OrderRequest};
use crate::services::OrderServiceError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order: OrderRequest,
    pub email_link: String,
    pub message: &'static str,
}

/// POST /api/orders
///
/// Stores the request, answers with a prefilled `mailto:` link for the customer
/// and notifies the studio in the background.
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateOrderInput>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let order = state.order_service.create(input).await.map_err(|e| match e {
        OrderServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        other => ApiError::internal(other, "Internal server error"),
    })?;

    let artwork_title = state.order_service.artwork_title(&order).await;
    let email_link = state
        .order_service
        .generate_order_email(&order, artwork_title.as_deref());

    let email = state.email_service.clone();
    let notified = order.clone();
    tokio::spawn(async move {
        if let Err(e) = email
            .send_order_notification(&notified, artwork_title.as_deref())
            .await
        {
            tracing::error!("Failed to send order notification for {}: {:#}", notified.id, e);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order,
            email_link,
            message: "Order request created successfully",
        }),
    ))
}
