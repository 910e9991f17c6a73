// src/llm/mod.rs

//! Chat-completions provider: request types, the provider trait that the
//! orchestrators depend on, and the HTTP implementation.

pub mod client;
pub mod error;
pub mod sse;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

pub use client::LlmClient;
pub use error::UpstreamError;

/// Incremental text chunks from a streamed completion.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt / instructions
    pub system: String,
    /// Conversation turns after the system prompt
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub completions_path: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmSettings {
    /// `base_url` and `completions_path` joined with exactly one slash.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.completions_path.trim_start_matches('/')
        )
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Non-streaming completion; returns the assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError>;

    /// Streaming completion. Errors before the body starts (HTTP status,
    /// missing body) are returned here; later failures arrive in the stream.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, UpstreamError>;
}
