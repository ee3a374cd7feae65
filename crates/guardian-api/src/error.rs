//! HTTP error responses.
//!
//! Every error body has the same shape:
//! `{"error": <title>, "message": <detail>, "code": <MACHINE_CODE>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("rate limit exceeded")]
    TooManyRequests,

    /// Detail is logged by the caller and never echoed to the client.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Invalid Request",
            ApiError::Unauthorized { .. } => "Invalid Caller Identity",
            ApiError::TooManyRequests => "Too Many Requests",
            ApiError::Internal => "Internal Server Error",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "INVALID_REQUEST",
            ApiError::Unauthorized { code, .. } => code,
            ApiError::TooManyRequests => "RATE_LIMITED",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.title(),
            "message": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
