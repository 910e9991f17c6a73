// src/api/http/portfolio.rs
// Brief, generation and revision endpoints

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

use super::common::UserId;
use crate::api::error::{ApiError, ApiResult, IntoApiErrorOption};
use crate::portfolio::{Brief, GenerationError, GenerationOutcome};
use crate::state::AppState;

const DEFAULT_REVISION_PAGE: usize = 50;
const MAX_REVISION_PAGE: usize = 200;

#[derive(Deserialize)]
pub struct ReviseRequest {
    pub instruction: String,
}

#[derive(Deserialize)]
pub struct RevisionsQuery {
    pub limit: Option<usize>,
}

pub async fn put_brief(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(brief): Json<Brief>,
) -> ApiResult<Json<Brief>> {
    let brief = brief.validated()?;
    app_state.portfolio_store.save_brief(&user_id, &brief).await?;
    info!("Saved brief for {}", user_id);
    Ok(Json(brief))
}

pub async fn get_brief(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> ApiResult<Json<Brief>> {
    let brief = app_state
        .portfolio_store
        .get_brief(&user_id)
        .await?
        .ok_or_not_found("No brief saved")?;
    Ok(Json(brief))
}

/// Run a generation on its own task. Dropping the request (client gone)
/// only drops the `JoinHandle`; the run still finishes and saves.
async fn detached<F>(job: F) -> ApiResult<GenerationOutcome>
where
    F: Future<Output = Result<GenerationOutcome, GenerationError>> + Send + 'static,
{
    match tokio::spawn(job).await {
        Ok(result) => Ok(result?),
        Err(e) => {
            error!("Generation task aborted: {}", e);
            Err(ApiError::internal("Generation task aborted"))
        }
    }
}

/// Answers once the whole generation is done; clients follow progress
/// through `/api/streams/latest` in the meantime.
pub async fn generate_handler(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> impl IntoResponse {
    let service = app_state.portfolio_service.clone();
    let result: ApiResult<_> = async {
        let outcome = detached(async move { service.generate(&user_id).await }).await?;
        Ok(Json(outcome))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}

pub async fn revise_handler(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<ReviseRequest>,
) -> impl IntoResponse {
    let service = app_state.portfolio_service.clone();
    let result: ApiResult<_> = async {
        let outcome = detached(async move { service.revise(&user_id, &request.instruction).await }).await?;
        Ok(Json(outcome))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}

pub async fn get_portfolio(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> impl IntoResponse {
    let result: ApiResult<_> = async {
        let document = app_state
            .portfolio_store
            .get_portfolio(&user_id)
            .await?
            .ok_or_not_found("No portfolio generated yet")?;
        Ok(Json(document))
    }
    .await;

    match result {
        Ok(response) => response.into_response(),
        Err(error) => error.into_response(),
    }
}

pub async fn get_revisions(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(params): Query<RevisionsQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_REVISION_PAGE)
        .clamp(1, MAX_REVISION_PAGE);
    let messages = app_state
        .portfolio_store
        .recent_revision_messages(&user_id, limit)
        .await?;
    Ok(Json(serde_json::json!({ "messages": messages })))
}
