//! Error types for forno-api.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API service errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Webhook verification failed")]
    WebhookVerificationFailed,

    #[error("WhatsApp channel is not configured")]
    ChannelDisabled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error payload inside the response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::WebhookVerificationFailed => (StatusCode::FORBIDDEN, "VERIFICATION_FAILED"),
            ApiError::ChannelDisabled => (StatusCode::SERVICE_UNAVAILABLE, "CHANNEL_DISABLED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!("API error: {self}");
        }

        let body = serde_json::json!({
            "success": false,
            "error": ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
