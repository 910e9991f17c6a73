// src/portfolio/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{optional_text, required_text, ValidationError};

pub const MAX_NAME_CHARS: usize = 120;
pub const MAX_HEADLINE_CHARS: usize = 160;
pub const MAX_LONG_FIELD_CHARS: usize = 4000;
pub const MAX_LIST_FIELD_CHARS: usize = 1000;
pub const MAX_TONE_CHARS: usize = 200;

/// What the user tells us about themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub name: String,
    #[serde(default)]
    pub headline: Option<String>,
    pub about: String,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub links: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

impl Brief {
    /// Trim every field and enforce the size limits.
    pub fn validated(&self) -> Result<Brief, ValidationError> {
        Ok(Brief {
            name: required_text("name", &self.name, MAX_NAME_CHARS)?,
            headline: optional_text("headline", self.headline.as_deref(), MAX_HEADLINE_CHARS)?,
            about: required_text("about", &self.about, MAX_LONG_FIELD_CHARS)?,
            experience: optional_text("experience", self.experience.as_deref(), MAX_LONG_FIELD_CHARS)?,
            skills: optional_text("skills", self.skills.as_deref(), MAX_LIST_FIELD_CHARS)?,
            links: optional_text("links", self.links.as_deref(), MAX_LIST_FIELD_CHARS)?,
            tone: optional_text("tone", self.tone.as_deref(), MAX_TONE_CHARS)?,
        })
    }
}

/// Normalized generation output. Every field is present and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPortfolio {
    pub headline: String,
    pub elevator_pitch: String,
    pub about: String,
    pub skills: Vec<String>,
    pub highlighted_projects: Vec<Project>,
    pub section_blocks: Vec<SectionBlock>,
    pub theme: Theme,
    pub cta: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub summary: String,
    pub stack: Vec<String>,
    pub impact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBlock {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub bg: String,
    pub bg_surface: String,
    pub ink: String,
    pub accent: String,
    pub font_body: String,
    pub font_display: String,
    pub radius: String,
}

/// The portfolio currently saved for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDocument {
    pub user_id: String,
    pub portfolio: GeneratedPortfolio,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionRole {
    User,
    Assistant,
}

impl RevisionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionRole::User => "user",
            RevisionRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(RevisionRole::User),
            "assistant" => Some(RevisionRole::Assistant),
            _ => None,
        }
    }
}

/// One turn of the revision chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMessage {
    pub role: RevisionRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A published snapshot reachable at `/p/{slug}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedSite {
    pub slug: String,
    pub user_id: String,
    pub portfolio: GeneratedPortfolio,
    pub published_at: DateTime<Utc>,
}
