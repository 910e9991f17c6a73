// src/api/http/payments.rs
// Checkout creation and the provider webhook

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use super::common::UserId;
use crate::api::error::ApiResult;
use crate::payments::webhook::{self, SIGNATURE_HEADER};
use crate::payments::{start_checkout, CheckoutSession, WebhookOutcome};
use crate::state::AppState;

pub async fn checkout_handler(
    State(app_state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> ApiResult<Json<CheckoutSession>> {
    let discounted = app_state
        .bargain_store
        .get_session(&user_id)
        .await?
        .is_some_and(|s| s.discount_unlocked);

    let session = start_checkout(
        app_state.checkout.as_ref(),
        &app_state.checkout_settings,
        &user_id,
        discounted,
    )
    .await?;
    Ok(Json(session))
}

/// Signature is checked against the raw bytes, so the body is taken as-is.
pub async fn webhook_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    webhook::verify_signature(&app_state.webhook_settings, signature, &body, Utc::now().timestamp())?;

    let outcome = match webhook::handle_event(app_state.payment_store.as_ref(), &body).await? {
        WebhookOutcome::Recorded(_) => "recorded",
        WebhookOutcome::Duplicate(_) => "duplicate",
        WebhookOutcome::Ignored(_) => "ignored",
    };
    Ok(Json(json!({ "received": true, "outcome": outcome })))
}
