// src/api/http/common.rs
// Request identity supplied by the gateway in front of this service

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const MAX_USER_ID_CHARS: usize = 128;

/// The authenticated caller. Rejects with 401 when the header is missing,
/// blank or oversized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();

        if value.is_empty() || value.chars().count() > MAX_USER_ID_CHARS {
            return Err(ApiError::unauthorized("Missing or invalid x-user-id header"));
        }
        Ok(UserId(value.to_string()))
    }
}
