// tests/test_helpers.rs
// Shared fakes and request helpers for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use folio::api::http_router;
use folio::bargain::BargainSettings;
use folio::llm::{ChunkStream, CompletionProvider, CompletionRequest, UpstreamError};
use folio::payments::{CheckoutError, CheckoutGateway, CheckoutSettings, WebhookSettings};
use folio::state::{AppState, StateSettings};
use folio::store::{BargainStore, MemoryStore, PaymentStore, PortfolioStore, StreamStore};

pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Streams scripted chunk lists and answers non-streaming calls from a queue.
#[derive(Default)]
pub struct FakeLlm {
    pub streams: Mutex<VecDeque<Vec<String>>>,
    pub replies: Mutex<VecDeque<String>>,
    pub calls: AtomicUsize,
    /// Pause before each streamed chunk
    pub chunk_delay: Mutex<Duration>,
}

impl FakeLlm {
    pub fn push_stream(&self, chunks: &[&str]) {
        self.streams
            .lock()
            .push_back(chunks.iter().map(|c| c.to_string()).collect());
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().push_back(reply.to_string());
    }

    pub fn set_chunk_delay(&self, delay: Duration) {
        *self.chunk_delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for FakeLlm {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies.lock().pop_front().ok_or(UpstreamError::Unavailable)
    }

    async fn stream(&self, _request: CompletionRequest) -> Result<ChunkStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let chunks = self.streams.lock().pop_front().ok_or(UpstreamError::Unavailable)?;
        let items: Vec<Result<String, UpstreamError>> = chunks.into_iter().map(Ok).collect();

        let delay = *self.chunk_delay.lock();
        if delay.is_zero() {
            return Ok(Box::pin(stream::iter(items)));
        }
        Ok(Box::pin(stream::iter(items).then(move |item| async move {
            tokio::time::sleep(delay).await;
            item
        })))
    }
}

#[derive(Default)]
pub struct FakeCheckout {
    pub sessions: Mutex<Vec<(String, i64, String)>>,
}

#[async_trait]
impl CheckoutGateway for FakeCheckout {
    async fn create_session(
        &self,
        user_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<(String, String), CheckoutError> {
        folio::payments::checkout::validate_charge(amount_cents, currency)?;
        let mut sessions = self.sessions.lock();
        sessions.push((user_id.to_string(), amount_cents, currency.to_string()));
        let id = format!("cs_test_{}", sessions.len());
        Ok((id.clone(), format!("https://pay.example/{id}")))
    }
}

pub fn settings() -> StateSettings {
    StateSettings {
        flush_interval: Duration::ZERO,
        bargain: BargainSettings::default(),
        checkout: CheckoutSettings {
            api_key: "sk_test".into(),
            base_url: "http://127.0.0.1:9".into(),
            public_url: "http://localhost:3001".into(),
            price_cents: 1900,
            discount_percent: 50,
            currency: "usd".into(),
        },
        webhook: WebhookSettings {
            secret: WEBHOOK_SECRET.into(),
            tolerance: Duration::from_secs(300),
        },
        model: "test-model".into(),
    }
}

pub struct TestApp<S> {
    pub router: Router,
    pub store: Arc<S>,
    pub llm: Arc<FakeLlm>,
    pub checkout: Arc<FakeCheckout>,
}

pub fn test_app_with<S>(store: Arc<S>) -> TestApp<S>
where
    S: PortfolioStore + StreamStore + PaymentStore + BargainStore + 'static,
{
    let llm = Arc::new(FakeLlm::default());
    let checkout = Arc::new(FakeCheckout::default());
    let state = AppState::new(store.clone(), llm.clone(), checkout.clone(), settings());
    TestApp {
        router: http_router(Arc::new(state)),
        store,
        llm,
        checkout,
    }
}

pub fn test_app() -> TestApp<MemoryStore> {
    test_app_with(Arc::new(MemoryStore::new()))
}

pub async fn send_raw(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

/// JSON request as `user`; returns the status and parsed body (Null when empty).
pub async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let (status, _, bytes) = send_raw(router, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Signed webhook delivery.
pub async fn deliver_webhook(router: &Router, body: &str, timestamp: i64) -> (StatusCode, Value) {
    let signature = folio::payments::webhook::sign(WEBHOOK_SECRET, timestamp, body.as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("content-type", "application/json")
        .header(
            folio::payments::webhook::SIGNATURE_HEADER,
            format!("t={timestamp},v1={signature}"),
        )
        .body(Body::from(body.to_string()))
        .unwrap();

    let (status, _, bytes) = send_raw(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub fn completed_checkout(session_id: &str, user: &str, amount: i64) -> String {
    serde_json::json!({
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": session_id,
            "client_reference_id": user,
            "amount_total": amount,
            "currency": "usd"
        }}
    })
    .to_string()
}
