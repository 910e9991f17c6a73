// tests/llm_stream_test.rs
// LlmClient against a local mock provider

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures::StreamExt;

use folio::llm::{ChatMessage, CompletionProvider, CompletionRequest, LlmClient, LlmSettings, UpstreamError};
use folio::portfolio::{Brief, PortfolioService};
use folio::relay::{StreamKind, StreamState};
use folio::store::{MemoryStore, PortfolioStore, StreamStore};

fn event_stream(parts: Vec<&'static [u8]>) -> Response {
    let frames = futures::stream::iter(
        parts
            .into_iter()
            .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p))),
    );
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(frames))
        .unwrap()
}

async fn split_frames() -> Response {
    event_stream(vec![
        &b": keep-alive\n\n"[..],
        &b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n"[..],
        &b"\ndata: {\"choices\":[{\"delta\":{\"con"[..],
        &b"tent\":\"lo caf\xc3"[..],
        &b"\xa9\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"reasoning\":\"hmm \",\"content\":\"!\"}}]}\n\n"[..],
        &b"data: not json\n\n"[..],
        &b"data: [DONE]\n\n"[..],
    ])
}

async fn portfolio_frames() -> Response {
    event_stream(vec![
        &b"data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"headline\\\": \\\"Mock\"}}]}\n\n"[..],
        &b"data: {\"choices\":[{\"delta\":{\"content\":\" headline\\\"}\"}}]}\n\n"[..],
        &b"data: [DONE]\n\n"[..],
    ])
}

async fn complete_json() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": "plain answer"}}]
    }))
}

async fn rate_limited() -> impl IntoResponse {
    (
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"error":{"code":429,"details":[{"@type":"RetryInfo","retryDelay":"17s"}]}}"#,
    )
}

async fn bad_key() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#,
    )
}

async fn overloaded() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
}

async fn spawn_mock() -> String {
    let app = Router::new()
        .route("/split/v1/chat/completions", post(split_frames))
        .route("/portfolio/v1/chat/completions", post(portfolio_frames))
        .route("/complete/v1/chat/completions", post(complete_json))
        .route("/limited/v1/chat/completions", post(rate_limited))
        .route("/badkey/v1/chat/completions", post(bad_key))
        .route("/busy/v1/chat/completions", post(overloaded));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, scenario: &str) -> LlmClient {
    LlmClient::new(LlmSettings {
        api_key: "test-key".into(),
        base_url: base_url.into(),
        completions_path: format!("/{scenario}/v1/chat/completions"),
        model: "mock-model".into(),
        max_tokens: 512,
        temperature: 0.5,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new("system", vec![ChatMessage::user("hi")])
}

#[tokio::test]
async fn test_stream_reassembles_split_frames() {
    let base = spawn_mock().await;
    let chunks: Vec<String> = client(&base, "split")
        .stream(request())
        .await
        .unwrap()
        .map(|c| c.unwrap())
        .collect()
        .await;

    assert_eq!(chunks, vec!["Hel", "lo café", "hmm !"]);
}

#[tokio::test]
async fn test_complete_reads_message_content() {
    let base = spawn_mock().await;
    let text = client(&base, "complete").complete(request()).await.unwrap();
    assert_eq!(text, "plain answer");
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let base = spawn_mock().await;

    let err = client(&base, "limited").stream(request()).await.err().unwrap();
    assert_eq!(err, UpstreamError::RateLimited { retry_after_secs: Some(17.0) });
    assert!(err.to_string().contains("retry in about 17s"));

    let err = client(&base, "badkey").complete(request()).await.unwrap_err();
    assert_eq!(err, UpstreamError::InvalidApiKey);

    let err = client(&base, "busy").stream(request()).await.err().unwrap();
    assert_eq!(err, UpstreamError::Unavailable);
}

#[tokio::test]
async fn test_generation_over_mock_provider() {
    let base = spawn_mock().await;
    let store = Arc::new(MemoryStore::new());
    let service = PortfolioService::new(
        store.clone(),
        store.clone(),
        Arc::new(client(&base, "portfolio")),
        Duration::ZERO,
    );

    let brief = Brief {
        name: "Ada".into(),
        headline: None,
        about: "Engines".into(),
        experience: None,
        skills: None,
        links: None,
        tone: None,
    };
    store.save_brief("u1", &brief).await.unwrap();

    let outcome = service.generate("u1").await.unwrap();
    assert_eq!(outcome.document.portfolio.headline, "Mock headline");

    let record = store
        .latest_stream("u1", StreamKind::Generation)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.id, outcome.stream_id);
    assert_eq!(record.state, StreamState::Completed);
    assert_eq!(record.text, r#"{"headline": "Mock headline"}"#);
}
