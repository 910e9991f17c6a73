// src/api/http/router.rs
// HTTP router composition

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::{
    bargain::{bargain_message, get_bargain, start_bargain},
    handlers::health_handler,
    payments::{checkout_handler, webhook_handler},
    portfolio::{
        generate_handler, get_brief, get_portfolio, get_revisions, put_brief, revise_handler,
    },
    site::{page_handler, publish_handler},
    streams::{get_stream, latest_stream},
};
use crate::state::AppState;

const WEBHOOK_MAX_BODY_BYTES: usize = 256 * 1024;

pub fn http_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
        ]);

    let nosniff = SetResponseHeaderLayer::if_not_present(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Router::new()
        // Health
        .route("/health", get(health_handler))

        // Brief + portfolio
        .route("/api/brief", get(get_brief).put(put_brief))
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/portfolio/generate", post(generate_handler))
        .route("/api/portfolio/revise", post(revise_handler))
        .route("/api/portfolio/revisions", get(get_revisions))

        // Stream polling
        .route("/api/streams/latest", get(latest_stream))
        .route("/api/streams/{id}", get(get_stream))

        // Negotiation
        .route("/api/bargain", get(get_bargain))
        .route("/api/bargain/start", post(start_bargain))
        .route("/api/bargain/message", post(bargain_message))

        // Payments + publishing
        .route("/api/checkout", post(checkout_handler))
        .route("/api/publish", post(publish_handler))
        .route(
            "/webhooks/payment",
            post(webhook_handler).layer(DefaultBodyLimit::max(WEBHOOK_MAX_BODY_BYTES)),
        )

        // Public pages
        .route("/p/{slug}", get(page_handler))

        .layer(nosniff)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
