// src/llm/client.rs
// OpenAI-compatible chat-completions client (streaming and non-streaming)

use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{sse, ChatMessage, ChatRole, ChunkStream, CompletionProvider, CompletionRequest, LlmSettings, UpstreamError};

pub struct LlmClient {
    http: ReqwestClient,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> anyhow::Result<Self> {
        info!(
            "Initializing LLM client: model={}, endpoint={}",
            settings.model,
            settings.completions_url()
        );

        let http = ReqwestClient::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { http, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn build_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::System,
                content: request.system.clone(),
            });
        }
        messages.extend(request.messages.iter().cloned());

        json!({
            "model": self.settings.model,
            "messages": messages,
            "stream": stream,
            "max_tokens": request.max_tokens.unwrap_or(self.settings.max_tokens),
            "temperature": request.temperature.unwrap_or(self.settings.temperature),
        })
    }

    async fn send(&self, body: &Value, stream: bool) -> Result<Response, UpstreamError> {
        if self.settings.api_key.trim().is_empty() {
            return Err(UpstreamError::NotConfigured("LLM_API_KEY is not set".into()));
        }

        let accept = if stream { "text/event-stream" } else { "application/json" };
        let response = self
            .http
            .post(self.settings.completions_url())
            .bearer_auth(&self.settings.api_key)
            .header(header::ACCEPT, accept)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.unwrap_or_else(|_| "<no body>".into());
        let err = UpstreamError::from_status(status.as_u16(), &text, retry_after.as_deref());
        warn!("LLM request failed: {}", err);
        Err(err)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError> {
        let body = self.build_body(&request, false);
        debug!("Sending non-streaming completion ({} messages)", request.messages.len());

        let value: Value = self
            .send(&body, false)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Malformed("missing choices[0].message.content".into()))
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, UpstreamError> {
        let body = self.build_body(&request, true);
        debug!("Sending streaming completion ({} messages)", request.messages.len());

        let response = self.send(&body, true).await?;
        if response.content_length() == Some(0) {
            return Err(UpstreamError::EmptyBody);
        }

        Ok(Box::pin(sse::chunk_stream(Box::pin(response.bytes_stream()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(api_key: &str) -> LlmClient {
        LlmClient::new(LlmSettings {
            api_key: api_key.into(),
            base_url: "http://127.0.0.1:9".into(),
            completions_path: "/v1/chat/completions".into(),
            model: "test-model".into(),
            max_tokens: 256,
            temperature: 0.3,
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_build_body() {
        let request = CompletionRequest::new("be brief", vec![ChatMessage::user("hello")])
            .with_temperature(0.9);
        let body = client("k").build_body(&request, true);

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert!((body["temperature"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let request = CompletionRequest::new("", vec![ChatMessage::user("hi")]);
        let body = client("k").build_body(&request, false);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let request = CompletionRequest::new("s", vec![ChatMessage::user("u")]);
        let err = client(" ").complete(request).await.unwrap_err();
        assert!(matches!(err, UpstreamError::NotConfigured(_)));
    }
}
