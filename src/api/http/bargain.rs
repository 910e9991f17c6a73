// src/api/http/bargain.rs

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::common::UserId;
use crate::api::error::ApiResult;
use crate::bargain::{BargainReply, BargainSession};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BargainMessageRequest {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BargainSessionResponse {
    #[serde(flatten)]
    pub session: BargainSession,
    pub messages_remaining: u32,
}

fn session_response(app_state: &AppState, session: BargainSession) -> Json<BargainSessionResponse> {
    let limit = app_state.bargain_service.settings().message_limit;
    Json(BargainSessionResponse {
        messages_remaining: limit.saturating_sub(session.message_count),
        session,
    })
}

pub async fn start_bargain(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> ApiResult<Json<BargainSessionResponse>> {
    let session = app_state.bargain_service.start(&user_id).await?;
    Ok(session_response(&app_state, session))
}

pub async fn bargain_message(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<BargainMessageRequest>,
) -> ApiResult<Json<BargainReply>> {
    let reply = app_state.bargain_service.send(&user_id, &request.message).await?;
    Ok(Json(reply))
}

pub async fn get_bargain(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> ApiResult<Json<BargainSessionResponse>> {
    let session = app_state.bargain_service.get(&user_id).await?;
    Ok(session_response(&app_state, session))
}
