// src/api/http/streams.rs
// Polling endpoints for in-flight generations

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::common::UserId;
use crate::api::error::{ApiError, ApiResult, IntoApiErrorOption};
use crate::relay::{StreamKind, StreamRecord};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LatestQuery {
    pub kind: Option<String>,
}

pub async fn latest_stream(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(params): Query<LatestQuery>,
) -> ApiResult<Json<StreamRecord>> {
    let kind = match params.kind.as_deref() {
        None => StreamKind::Generation,
        Some(raw) => StreamKind::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown stream kind '{raw}'")))?,
    };

    let record = app_state
        .stream_store
        .latest_stream(&user_id, kind)
        .await?
        .ok_or_not_found("No stream yet")?;
    Ok(Json(record))
}

/// Records belonging to someone else look the same as missing ones.
pub async fn get_stream(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<StreamRecord>> {
    let record = app_state
        .stream_store
        .get_stream(&id)
        .await?
        .filter(|r| r.owner == user_id)
        .ok_or_not_found("Stream not found")?;
    Ok(Json(record))
}
