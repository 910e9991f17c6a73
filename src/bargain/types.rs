// src/bargain/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BargainRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BargainMessage {
    pub role: BargainRole,
    pub content: String,
    /// Applied mood change, set on assistant turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_change: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One negotiation with the shopkeeper persona. A user has at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BargainSession {
    pub id: String,
    pub user_id: String,
    pub mood: i32,
    pub messages: Vec<BargainMessage>,
    pub message_count: u32,
    pub discount_unlocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BargainSession {
    pub fn new(user_id: &str, initial_mood: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            mood: initial_mood,
            messages: Vec::new(),
            message_count: 0,
            discount_unlocked: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of one exchange, as returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BargainReply {
    pub response: String,
    pub mood: i32,
    pub mood_change: i32,
    pub discount_unlocked: bool,
    pub messages_remaining: u32,
}
