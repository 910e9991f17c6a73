// src/api/http/site.rs
// Publishing and the public page

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::common::UserId;
use crate::api::error::{ApiError, ApiResult, IntoApiErrorOption};
use crate::site::{normalize_slug, render_page, validate_slug, CONTENT_SECURITY_POLICY};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PublishRequest {
    pub slug: String,
}

pub async fn publish_handler(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<PublishRequest>,
) -> impl IntoResponse {
    let result: ApiResult<_> = async {
        let slug = validate_slug(&request.slug)?;

        if !app_state.payment_store.has_paid(&user_id).await? {
            return Err(ApiError::payment_required("Publishing requires a completed payment"));
        }

        let document = app_state
            .portfolio_store
            .get_portfolio(&user_id)
            .await?
            .ok_or_not_found("No portfolio generated yet")?;

        let site = app_state
            .portfolio_store
            .publish(&user_id, &slug, &document.portfolio)
            .await?;
        info!("Published {} for {}", site.slug, user_id);

        Ok(Json(json!({
            "slug": site.slug,
            "url": format!("/p/{}", site.slug),
            "publishedAt": site.published_at,
        })))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}

pub async fn page_handler(
    State(app_state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let site = app_state
        .portfolio_store
        .get_published(&normalize_slug(&slug))
        .await?
        .ok_or_not_found("Page not found")?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY),
        ],
        render_page(&site.portfolio),
    ))
}
