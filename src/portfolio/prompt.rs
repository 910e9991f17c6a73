// src/portfolio/prompt.rs
// Prompts for first-time generation and chat-driven revision

use crate::llm::{ChatMessage, CompletionRequest};

use super::types::{Brief, GeneratedPortfolio, RevisionMessage, RevisionRole};

/// Revision messages replayed to the model
pub const REVISION_HISTORY: usize = 10;

pub const SYSTEM_PROMPT: &str = r#"
You are a senior copywriter and visual designer who writes personal portfolio sites.
Write in the first person, concrete and confident, never generic. Invent no employers, degrees or numbers the user did not give you.

Respond with a single JSON object and nothing else, using exactly this shape:
{
  "headline": "short, specific positioning line",
  "elevatorPitch": "two sentences on what they do and for whom",
  "about": "one or two paragraphs in the first person",
  "skills": ["skill", "..."],
  "highlightedProjects": [
    {"name": "", "summary": "", "stack": ["", ""], "impact": "", "imageUrl": "optional https URL", "gameUrl": "optional https URL"}
  ],
  "sectionBlocks": [{"title": "", "body": ""}],
  "theme": {
    "bg": "CSS colour", "bgSurface": "CSS colour", "ink": "CSS colour", "accent": "CSS colour",
    "fontBody": "font family name", "fontDisplay": "font family name", "radius": "CSS length"
  },
  "cta": "closing call to action"
}
Pick theme colours with enough contrast between ink and bg.
"#;

const REVISION_RULES: &str = r#"
You are now revising an existing portfolio. Apply the user's latest request, keep everything they did not ask to change, and return the complete updated object in the same shape.
"#;

fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        out.push_str(label);
        out.push_str(":\n");
        out.push_str(value);
        out.push_str("\n\n");
    }
}

pub fn generation_prompt(brief: &Brief) -> String {
    let mut out = String::from("Write a portfolio for this person.\n\n");
    push_field(&mut out, "Name", Some(&brief.name));
    push_field(&mut out, "Current headline", brief.headline.as_deref());
    push_field(&mut out, "About them", Some(&brief.about));
    push_field(&mut out, "Experience", brief.experience.as_deref());
    push_field(&mut out, "Skills", brief.skills.as_deref());
    push_field(&mut out, "Links", brief.links.as_deref());
    push_field(&mut out, "Preferred tone", brief.tone.as_deref());
    out.trim_end().to_string()
}

pub fn generation_request(brief: &Brief) -> CompletionRequest {
    CompletionRequest::new(SYSTEM_PROMPT.trim(), vec![ChatMessage::user(generation_prompt(brief))])
}

/// Current portfolio as JSON plus the instruction. History goes before it
/// as ordinary chat turns.
pub fn revision_request(
    current: &GeneratedPortfolio,
    history: &[RevisionMessage],
    instruction: &str,
) -> CompletionRequest {
    let system = format!("{}\n{}", SYSTEM_PROMPT.trim(), REVISION_RULES.trim());
    let skip = history.len().saturating_sub(REVISION_HISTORY);

    let mut messages: Vec<ChatMessage> = history[skip..]
        .iter()
        .map(|m| match m.role {
            RevisionRole::User => ChatMessage::user(m.content.clone()),
            RevisionRole::Assistant => ChatMessage::assistant(m.content.clone()),
        })
        .collect();

    let current_json = serde_json::to_string_pretty(current).unwrap_or_else(|_| "{}".into());
    messages.push(ChatMessage::user(format!(
        "Current portfolio:\n```json\n{current_json}\n```\n\nRequested change:\n{instruction}"
    )));

    CompletionRequest::new(system, messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::normalize::normalize_portfolio;
    use chrono::Utc;
    use serde_json::json;

    fn brief() -> Brief {
        Brief {
            name: "Ada".into(),
            headline: None,
            about: "I build engines.".into(),
            experience: Some("Analytical Engine, 1843".into()),
            skills: None,
            links: Some(String::new()),
            tone: Some("warm".into()),
        }
    }

    #[test]
    fn test_generation_prompt_skips_missing_fields() {
        let prompt = generation_prompt(&brief());
        assert!(prompt.contains("Name:\nAda"));
        assert!(prompt.contains("Experience:\nAnalytical Engine, 1843"));
        assert!(prompt.contains("Preferred tone:\nwarm"));
        assert!(!prompt.contains("Skills:"));
        assert!(!prompt.contains("Links:"));
    }

    #[test]
    fn test_revision_request_windows_history() {
        let history: Vec<RevisionMessage> = (0..14)
            .map(|i| RevisionMessage {
                role: if i % 2 == 0 { RevisionRole::User } else { RevisionRole::Assistant },
                content: format!("turn {i}"),
                created_at: Utc::now(),
            })
            .collect();
        let current = normalize_portfolio(&json!({"headline": "Engine whisperer"}));

        let request = revision_request(&current, &history, "make it punchier");
        assert_eq!(request.messages.len(), REVISION_HISTORY + 1);
        assert_eq!(request.messages[0].content, "turn 4");

        let last = &request.messages[REVISION_HISTORY].content;
        assert!(last.contains("Engine whisperer"));
        assert!(last.ends_with("make it punchier"));
        assert!(request.system.contains("revising an existing portfolio"));
    }
}
