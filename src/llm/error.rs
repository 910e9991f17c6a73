// src/llm/error.rs
// Classification of provider failures into operator-facing messages.
// Nothing here retries; the category only decides the wording.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const BODY_SNIPPET_CHARS: usize = 300;

static RETRY_DELAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:"retryDelay"\s*:\s*"|retry\s+(?:in|after)\s+)(\d+(?:\.\d+)?)\s*s"#)
        .expect("retry delay regex is valid")
});

const INVALID_KEY_SIGNATURES: [&str; 4] = [
    "api key not valid",
    "invalid api key",
    "api_key_invalid",
    "invalid_api_key",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    #[error("LLM provider rejected the API key (HTTP 400); check LLM_API_KEY")]
    InvalidApiKey,

    #[error("LLM provider authentication failed (HTTP {status}); check LLM_API_KEY and model access")]
    Unauthorized { status: u16 },

    #[error("LLM provider quota or rate limit exceeded (HTTP 429){}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<f64> },

    #[error("LLM provider is temporarily unavailable (HTTP 503); try again shortly")]
    Unavailable,

    #[error("LLM provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("LLM provider response had no readable body")]
    EmptyBody,

    #[error("LLM provider is not configured: {0}")]
    NotConfigured(String),

    #[error("request to LLM provider failed: {0}")]
    Transport(String),

    #[error("LLM provider returned an unexpected payload: {0}")]
    Malformed(String),
}

fn retry_hint(secs: &Option<f64>) -> String {
    match secs {
        Some(s) => format!("; retry in about {}s", s.ceil() as u64),
        None => String::new(),
    }
}

impl UpstreamError {
    /// Map a non-success response to an error category.
    pub fn from_status(status: u16, body: &str, retry_after_header: Option<&str>) -> Self {
        match status {
            400 if has_invalid_key_signature(body) => UpstreamError::InvalidApiKey,
            401 | 403 => UpstreamError::Unauthorized { status },
            429 => UpstreamError::RateLimited {
                retry_after_secs: retry_delay_from_body(body)
                    .or_else(|| retry_after_header.and_then(|h| h.trim().parse::<f64>().ok())),
            },
            503 => UpstreamError::Unavailable,
            _ => UpstreamError::Http {
                status,
                body: body.chars().take(BODY_SNIPPET_CHARS).collect(),
            },
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Transport(e.to_string())
    }
}

fn has_invalid_key_signature(body: &str) -> bool {
    let lower = body.to_lowercase();
    INVALID_KEY_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Seconds to wait, when the provider says so in the error body.
pub fn retry_delay_from_body(body: &str) -> Option<f64> {
    RETRY_DELAY_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
