// src/bargain/mod.rs

//! Discount negotiation with a scripted shopkeeper persona.
//!
//! Each user has one session. Every message moves a mood score in [0, 100];
//! reaching the unlock threshold grants the discount for good. The model's
//! reply is read with a single embedded-object regex rather than the full
//! extraction engine, and any failure degrades to an in-character line with
//! no mood change.

pub mod persona;
pub mod types;

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{ChatMessage, CompletionProvider, CompletionRequest};
use crate::store::{BargainStore, StoreError};
use crate::validation::{required_text, ValidationError};

pub use types::{BargainMessage, BargainReply, BargainRole, BargainSession};

pub const MAX_MESSAGE_CHARS: usize = 500;

static EMBEDDED_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("embedded object regex is valid"));

#[derive(Debug, Clone)]
pub struct BargainSettings {
    /// User messages allowed per session
    pub message_limit: u32,
    pub initial_mood: i32,
    pub unlock_threshold: i32,
    pub min_change: i32,
    pub max_change: i32,
    /// Messages of history sent to the model
    pub history_window: usize,
}

impl Default for BargainSettings {
    fn default() -> Self {
        Self {
            message_limit: 50,
            initial_mood: 25,
            unlock_threshold: 80,
            min_change: -15,
            max_change: 12,
            history_window: 20,
        }
    }
}

#[derive(Debug, Error)]
pub enum BargainError {
    #[error("no bargain session; start one first")]
    NoSession,

    #[error("message limit of {limit} reached; start a new session to keep bargaining")]
    MessageLimit { limit: u32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the model said, before clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub response: String,
    pub mood_change: f64,
}

/// Round `raw_change`, clamp it to the per-turn bounds, then clamp the
/// resulting mood to [0, 100]. Returns the new mood and the change that
/// was actually applied.
pub fn apply_mood_change(mood: i32, raw_change: f64, settings: &BargainSettings) -> (i32, i32) {
    let rounded = if raw_change.is_finite() { raw_change.round() } else { 0.0 };
    let change = (rounded as i64).clamp(settings.min_change as i64, settings.max_change as i64) as i32;
    let next = (mood + change).clamp(0, 100);
    (next, next - mood)
}

/// Pull `{response, moodChange}` out of a model reply.
pub fn parse_reply(raw: &str) -> Option<ParsedReply> {
    let found = EMBEDDED_OBJECT_RE.find(raw)?;
    let value: Value = serde_json::from_str(found.as_str()).ok()?;

    let response = value.get("response")?.as_str()?.trim().to_string();
    if response.is_empty() {
        return None;
    }

    let mood_change = match value.get("moodChange") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };

    Some(ParsedReply { response, mood_change })
}

pub fn fallback_line() -> &'static str {
    let idx = rand::rng().random_range(0..persona::FALLBACK_LINES.len());
    persona::FALLBACK_LINES[idx]
}

pub struct BargainService {
    store: Arc<dyn BargainStore>,
    llm: Arc<dyn CompletionProvider>,
    settings: BargainSettings,
}

impl BargainService {
    pub fn new(store: Arc<dyn BargainStore>, llm: Arc<dyn CompletionProvider>, settings: BargainSettings) -> Self {
        Self { store, llm, settings }
    }

    pub fn settings(&self) -> &BargainSettings {
        &self.settings
    }

    /// Start a fresh session, discarding any previous one for the user.
    pub async fn start(&self, user_id: &str) -> Result<BargainSession, BargainError> {
        let session = BargainSession::new(user_id, self.settings.initial_mood);
        self.store.replace_session(&session).await?;
        info!("Bargain session {} started for {}", session.id, user_id);
        Ok(session)
    }

    pub async fn get(&self, user_id: &str) -> Result<BargainSession, BargainError> {
        self.store
            .get_session(user_id)
            .await?
            .ok_or(BargainError::NoSession)
    }

    pub async fn send(&self, user_id: &str, text: &str) -> Result<BargainReply, BargainError> {
        let text = required_text("message", text, MAX_MESSAGE_CHARS)?;
        let mut session = self.get(user_id).await?;

        if session.message_count >= self.settings.message_limit {
            return Err(BargainError::MessageLimit {
                limit: self.settings.message_limit,
            });
        }

        session.messages.push(BargainMessage {
            role: BargainRole::User,
            content: text,
            mood_change: None,
            created_at: Utc::now(),
        });
        session.message_count += 1;

        let parsed = self.ask_shopkeeper(&session).await;
        let (mood, applied) = match &parsed {
            Some(reply) => apply_mood_change(session.mood, reply.mood_change, &self.settings),
            None => (session.mood, 0),
        };
        let response = match parsed {
            Some(reply) => reply.response,
            None => fallback_line().to_string(),
        };

        session.mood = mood;
        if mood >= self.settings.unlock_threshold && !session.discount_unlocked {
            info!("Discount unlocked for {} at mood {}", user_id, mood);
            session.discount_unlocked = true;
        }
        session.messages.push(BargainMessage {
            role: BargainRole::Assistant,
            content: response.clone(),
            mood_change: Some(applied),
            created_at: Utc::now(),
        });
        session.updated_at = Utc::now();
        self.store.save_session(&session).await?;

        Ok(BargainReply {
            response,
            mood: session.mood,
            mood_change: applied,
            discount_unlocked: session.discount_unlocked,
            messages_remaining: self.settings.message_limit.saturating_sub(session.message_count),
        })
    }

    async fn ask_shopkeeper(&self, session: &BargainSession) -> Option<ParsedReply> {
        let system = persona::system_prompt(session.mood, session.message_count, self.settings.message_limit);
        let skip = session.messages.len().saturating_sub(self.settings.history_window);
        let history = session.messages[skip..]
            .iter()
            .map(|m| match m.role {
                BargainRole::User => ChatMessage::user(m.content.clone()),
                BargainRole::Assistant => ChatMessage::assistant(m.content.clone()),
            })
            .collect();

        match self.llm.complete(CompletionRequest::new(system, history)).await {
            Ok(raw) => {
                let parsed = parse_reply(&raw);
                if parsed.is_none() {
                    warn!("Unreadable shopkeeper reply, using fallback");
                    debug!("Raw reply: {}", raw);
                }
                parsed
            }
            Err(e) => {
                warn!("Shopkeeper call failed, using fallback: {}", e);
                None
            }
        }
    }
}
