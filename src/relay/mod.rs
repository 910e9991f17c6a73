// src/relay/mod.rs

//! Streaming relay: republishes model output to a persisted record that
//! clients poll while a generation is running.
//!
//! Chunks are coalesced in memory and written at most once per flush
//! interval, in arrival order. When the upstream stream ends the remainder
//! is flushed and a final empty append marks the record completed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::llm::{ChunkStream, UpstreamError};
use crate::store::{StoreError, StreamStore};

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);

/// Prefix written in front of the message when a stream fails.
pub const ERROR_TAG: &str = "[ERROR]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Streaming,
    Completed,
    Error,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Streaming => "streaming",
            StreamState::Completed => "completed",
            StreamState::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "streaming" => Some(StreamState::Streaming),
            "completed" => Some(StreamState::Completed),
            "error" => Some(StreamState::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamState::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Generation,
    Revision,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Generation => "generation",
            StreamKind::Revision => "revision",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generation" => Some(StreamKind::Generation),
            "revision" => Some(StreamKind::Revision),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub id: String,
    pub owner: String,
    pub kind: StreamKind,
    pub text: String,
    pub state: StreamState,
    pub chunk_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct StreamRelay {
    store: Arc<dyn StreamStore>,
    stream_id: String,
    interval: Duration,
    pending: String,
    full_text: String,
    last_flush: Instant,
}

impl StreamRelay {
    pub fn new(store: Arc<dyn StreamStore>, stream_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            store,
            stream_id: stream_id.into(),
            interval,
            pending: String::new(),
            full_text: String::new(),
            last_flush: Instant::now(),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Everything pushed so far, flushed or not.
    pub fn text(&self) -> &str {
        &self.full_text
    }

    pub async fn push(&mut self, chunk: &str) -> Result<(), StoreError> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.full_text.push_str(chunk);
        self.pending.push_str(chunk);

        if self.last_flush.elapsed() >= self.interval {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        debug!("Flushing {} bytes to stream {}", batch.len(), self.stream_id);
        self.store.append_chunk(&self.stream_id, &batch, None).await?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Flush the remainder, mark the record completed and return the full text.
    pub async fn finish(mut self) -> Result<String, StoreError> {
        self.flush().await?;
        self.store
            .append_chunk(&self.stream_id, "", Some(StreamState::Completed))
            .await?;
        info!("Stream {} completed ({} bytes)", self.stream_id, self.full_text.len());
        Ok(self.full_text)
    }

    /// Flush what arrived, then append an error-tagged chunk and mark the
    /// record as failed.
    pub async fn fail(mut self, message: &str) -> Result<(), StoreError> {
        self.flush().await?;
        let separator = if self.full_text.is_empty() { "" } else { "\n" };
        let tagged = format!("{separator}{ERROR_TAG} {message}");
        self.store
            .append_chunk(&self.stream_id, &tagged, Some(StreamState::Error))
            .await?;
        warn!("Stream {} failed: {}", self.stream_id, message);
        Ok(())
    }

    /// Drain `chunks` into the record. Returns the full text on success; an
    /// upstream error mid-stream marks the record failed and is returned.
    pub async fn pump(mut self, mut chunks: ChunkStream) -> Result<String, RelayError> {
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => self.push(&chunk).await?,
                Err(e) => {
                    self.fail(&e.to_string()).await?;
                    return Err(e.into());
                }
            }
        }
        Ok(self.finish().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use futures::stream;

    async fn setup(interval: Duration) -> (Arc<MemoryStore>, StreamRelay) {
        let store = Arc::new(MemoryStore::new());
        let record = store.create_stream("u1", StreamKind::Generation).await.unwrap();
        let relay = StreamRelay::new(store.clone(), record.id, interval);
        (store, relay)
    }

    fn chunk_stream(chunks: Vec<Result<String, UpstreamError>>) -> ChunkStream {
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_coalesce_within_interval() {
        let (store, mut relay) = setup(Duration::from_millis(200)).await;
        let id = relay.stream_id().to_string();

        relay.push("a").await.unwrap();
        relay.push("b").await.unwrap();
        assert!(store.chunks(&id).is_empty());

        tokio::time::advance(Duration::from_millis(250)).await;
        relay.push("c").await.unwrap();
        assert_eq!(store.chunks(&id), vec!["abc"]);

        relay.push("d").await.unwrap();
        let text = relay.finish().await.unwrap();

        assert_eq!(text, "abcd");
        assert_eq!(store.chunks(&id), vec!["abc", "d", ""]);
        let record = store.get_stream(&id).await.unwrap().unwrap();
        assert_eq!(record.state, StreamState::Completed);
        assert_eq!(record.text, "abcd");
    }

    #[tokio::test]
    async fn test_concatenated_chunks_reproduce_text() {
        let (store, relay) = setup(Duration::ZERO).await;
        let id = relay.stream_id().to_string();
        let parts = ["{\"head", "line\": \"é", "🚀\"", "", "}"];

        let text = relay
            .pump(chunk_stream(parts.iter().map(|p| Ok(p.to_string())).collect()))
            .await
            .unwrap();

        assert_eq!(text, parts.concat());
        assert_eq!(store.chunks(&id).concat(), parts.concat());
        let record = store.get_stream(&id).await.unwrap().unwrap();
        assert_eq!(record.text, parts.concat());
    }

    #[tokio::test]
    async fn test_upstream_error_marks_record_failed() {
        let (store, relay) = setup(Duration::from_secs(60)).await;
        let id = relay.stream_id().to_string();

        let result = relay
            .pump(chunk_stream(vec![
                Ok("partial".to_string()),
                Err(UpstreamError::Transport("connection reset".into())),
            ]))
            .await;

        assert!(matches!(result, Err(RelayError::Upstream(_))));
        let record = store.get_stream(&id).await.unwrap().unwrap();
        assert_eq!(record.state, StreamState::Error);
        assert!(record.text.starts_with("partial\n[ERROR]"));
    }

    #[tokio::test]
    async fn test_terminal_record_rejects_appends() {
        let (store, relay) = setup(Duration::ZERO).await;
        let id = relay.stream_id().to_string();
        relay.finish().await.unwrap();

        let err = store.append_chunk(&id, "late", None).await.unwrap_err();
        assert!(matches!(err, StoreError::StreamClosed(_)));
        assert_eq!(store.get_stream(&id).await.unwrap().unwrap().text, "");
    }
}
