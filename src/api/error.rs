// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

use crate::bargain::BargainError;
use crate::extract::ExtractError;
use crate::llm::UpstreamError;
use crate::payments::{CheckoutError, WebhookError};
use crate::portfolio::GenerationError;
use crate::store::StoreError;
use crate::validation::ValidationError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    fn with_code(status_code: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code: Some(code.to_string()),
        }
    }

    /// Create a new internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Create a new bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a new not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create a new unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::PAYMENT_REQUIRED, "PAYMENT_REQUIRED", message)
    }

    /// Create a new conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn too_many_requests(code: &str, message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::TOO_MANY_REQUESTS, code, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response_json = json!({
            "error": true,
            "message": self.message,
            "status": self.status_code.as_u16()
        });

        if let Some(error_code) = self.error_code {
            response_json["error_code"] = json!(error_code);
        }

        (self.status_code, Json(response_json)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Extension trait for Option<T> to create ApiError for None cases
pub trait IntoApiErrorOption<T> {
    fn ok_or_not_found(self, message: &str) -> Result<T, ApiError>;
}

impl<T> IntoApiErrorOption<T> for Option<T> {
    fn ok_or_not_found(self, message: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SlugTaken(_) => ApiError::conflict(e.to_string()),
            StoreError::StreamNotFound(_) => ApiError::not_found(e.to_string()),
            _ => {
                error!("Store failure: {:?}", e);
                ApiError::internal("Storage error")
            }
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::RateLimited { .. } => ApiError::too_many_requests("UPSTREAM_RATE_LIMITED", e.to_string()),
            UpstreamError::Unavailable => ApiError::service_unavailable(e.to_string()),
            _ => ApiError::bad_gateway(e.to_string()),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        warn!("{}", e);
        ApiError::with_code(StatusCode::UNPROCESSABLE_ENTITY, "MALFORMED_OUTPUT", e.to_string())
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Validation(e) => e.into(),
            GenerationError::NoBrief | GenerationError::NoPortfolio => ApiError::not_found(e.to_string()),
            GenerationError::Upstream(e) => e.into(),
            GenerationError::Extract(e) => e.into(),
            GenerationError::Store(e) => e.into(),
        }
    }
}

impl From<BargainError> for ApiError {
    fn from(e: BargainError) -> Self {
        match e {
            BargainError::NoSession => ApiError::not_found(e.to_string()),
            BargainError::MessageLimit { .. } => ApiError::too_many_requests("MESSAGE_LIMIT", e.to_string()),
            BargainError::Validation(e) => e.into(),
            BargainError::Store(e) => e.into(),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Validation(e) => e.into(),
            other => {
                error!("Checkout failed: {}", other);
                ApiError::bad_gateway(other.to_string())
            }
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::NotConfigured => {
                error!("Webhook received but PAYMENT_WEBHOOK_SECRET is not set");
                ApiError::internal(e.to_string())
            }
            WebhookError::Store(e) => e.into(),
            other => {
                warn!("Rejected webhook: {}", other);
                ApiError::bad_request(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_creation() {
        let error = ApiError::internal("Test error");
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Test error");
    }

    #[test]
    fn test_option_extensions() {
        let none_value: Option<i32> = None;
        let error = none_value.ok_or_not_found("Item not found").unwrap_err();
        assert_eq!(error.status_code, StatusCode::NOT_FOUND);
        assert_eq!(error.message, "Item not found");
    }

    #[test]
    fn test_domain_error_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ValidationError::new("name", "must not be empty").into(), StatusCode::BAD_REQUEST),
            (BargainError::MessageLimit { limit: 50 }.into(), StatusCode::TOO_MANY_REQUESTS),
            (BargainError::NoSession.into(), StatusCode::NOT_FOUND),
            (GenerationError::NoBrief.into(), StatusCode::NOT_FOUND),
            (StoreError::SlugTaken("ada".into()).into(), StatusCode::CONFLICT),
            (ExtractError { snippet: "x".into() }.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (UpstreamError::Unavailable.into(), StatusCode::SERVICE_UNAVAILABLE),
            (UpstreamError::InvalidApiKey.into(), StatusCode::BAD_GATEWAY),
            (
                UpstreamError::RateLimited { retry_after_secs: None }.into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (WebhookError::SignatureMismatch.into(), StatusCode::BAD_REQUEST),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code, status, "{}", error.message);
        }
    }

    #[test]
    fn test_message_limit_code() {
        let error: ApiError = BargainError::MessageLimit { limit: 50 }.into();
        assert_eq!(error.error_code.as_deref(), Some("MESSAGE_LIMIT"));
    }
}
