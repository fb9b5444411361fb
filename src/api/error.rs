//! API Error Types
//!
//! One enum for everything a handler can fail with, mapped onto HTTP
//! status codes and a JSON `{"error": "..."}` body. Upstream and internal
//! failures keep their cause for the log but show clients only a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Empty body, malformed JSON or an unusable key. Reported as 400.
    #[error("{message}")]
    InvalidRequest { message: String },

    /// The key is absent. Reported as 404 with an empty body.
    #[error("not found")]
    NotFound,

    /// The fixed-window request budget is exhausted. Reported as 429.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// A peer RPC failed at the transport level or answered non-2xx.
    /// Reported as 500.
    #[error("upstream failure: {message}")]
    Upstream { message: String },

    /// Empty ring or another condition that should not happen. Reported
    /// as 500.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::InvalidRequest { message } => message.clone(),
            Self::NotFound => String::new(),
            Self::RateLimited => "Rate limit exceeded".to_string(),
            Self::Upstream { .. } | Self::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Upstream { .. } | Self::Internal { .. }) {
            tracing::error!("Request failed: {}", self);
        }

        let status = self.status_code();
        if matches!(self, Self::NotFound) {
            return status.into_response();
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}
