// src/llm/sse.rs
// Line framing for chat-completions event streams

use bytes::Bytes;
use futures::stream::unfold;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use super::UpstreamError;

/// Text carried by one `data:` line: reasoning first, then content.
/// Returns `None` for comments, keep-alives, `[DONE]`, frames without
/// text and frames that fail to parse.
pub fn frame_text(line: &str) -> Option<String> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let frame: Value = match serde_json::from_str(data) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Skipping malformed stream frame ({}): {:.80}", e, data);
            return None;
        }
    };

    let delta = frame.get("choices")?.get(0)?.get("delta")?;
    let mut text = String::new();
    if let Some(reasoning) = delta.get("reasoning").and_then(Value::as_str) {
        text.push_str(reasoning);
    }
    if let Some(content) = delta.get("content").and_then(Value::as_str) {
        text.push_str(content);
    }

    (!text.is_empty()).then_some(text)
}

struct LineState<S> {
    inner: S,
    buffer: Vec<u8>,
    exhausted: bool,
}

/// Turn a raw body into a stream of chunk texts. Lines split across
/// network reads, including mid-codepoint splits, are reassembled first.
pub fn chunk_stream<S, E>(body: S) -> impl Stream<Item = Result<String, UpstreamError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = LineState {
        inner: body,
        buffer: Vec::new(),
        exhausted: false,
    };

    unfold(state, |mut state| async move {
        loop {
            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                if let Some(text) = frame_text(&String::from_utf8_lossy(&line)) {
                    return Some((Ok(text), state));
                }
                continue;
            }

            if state.exhausted {
                if state.buffer.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut state.buffer);
                if let Some(text) = frame_text(&String::from_utf8_lossy(&line)) {
                    return Some((Ok(text), state));
                }
                return None;
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    warn!("LLM stream read failed: {}", e);
                    state.exhausted = true;
                    state.buffer.clear();
                    return Some((Err(UpstreamError::Transport(e.to_string())), state));
                }
                None => state.exhausted = true,
            }
        }
    })
}
