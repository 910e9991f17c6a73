// src/portfolio/normalize.rs

//! Maps an untrusted recovered object onto [`GeneratedPortfolio`].
//!
//! Every field is handled independently and falls back to a fixed default,
//! so the result is always complete. Normalizing an already normalized
//! portfolio returns it unchanged.

use serde_json::{Map, Value};

use super::types::{GeneratedPortfolio, Project, SectionBlock, Theme};

pub const DEFAULT_HEADLINE: &str = "Building thoughtful products people love";
pub const DEFAULT_ELEVATOR_PITCH: &str =
    "I turn ambitious ideas into polished, reliable software that ships.";
pub const DEFAULT_ABOUT: &str =
    "I am a builder who cares about craft, clarity and the people who use what I make.";
pub const DEFAULT_CTA: &str = "Let's build something together";
pub const DEFAULT_SKILLS: [&str; 3] = ["Product thinking", "Software engineering", "Communication"];

pub const DEFAULT_PROJECT_NAME: &str = "Featured Project";
pub const DEFAULT_PROJECT_SUMMARY: &str =
    "A project that shows how I approach real problems from idea to launch.";
pub const DEFAULT_PROJECT_IMPACT: &str = "Delivered measurable value for its users.";
pub const DEFAULT_PROJECT_STACK: [&str; 2] = ["TypeScript", "React"];

pub const DEFAULT_SECTION_TITLE: &str = "What I Do";
pub const DEFAULT_SECTION_BODY: &str =
    "I design and build products end to end, from the first sketch to production.";

pub const DEFAULT_THEME_BG: &str = "#0b0d12";
pub const DEFAULT_THEME_BG_SURFACE: &str = "#151923";
pub const DEFAULT_THEME_INK: &str = "#e8ecf3";
pub const DEFAULT_THEME_ACCENT: &str = "#7c9cff";
pub const DEFAULT_THEME_FONT_BODY: &str = "Inter";
pub const DEFAULT_THEME_FONT_DISPLAY: &str = "Space Grotesk";
pub const DEFAULT_THEME_RADIUS: &str = "14px";

pub fn default_theme() -> Theme {
    Theme {
        bg: DEFAULT_THEME_BG.to_string(),
        bg_surface: DEFAULT_THEME_BG_SURFACE.to_string(),
        ink: DEFAULT_THEME_INK.to_string(),
        accent: DEFAULT_THEME_ACCENT.to_string(),
        font_body: DEFAULT_THEME_FONT_BODY.to_string(),
        font_display: DEFAULT_THEME_FONT_DISPLAY.to_string(),
        radius: DEFAULT_THEME_RADIUS.to_string(),
    }
}

/// Total: any JSON value produces a complete portfolio.
pub fn normalize_portfolio(raw: &Value) -> GeneratedPortfolio {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    GeneratedPortfolio {
        headline: text_or(obj.get("headline"), DEFAULT_HEADLINE),
        elevator_pitch: text_or(obj.get("elevatorPitch"), DEFAULT_ELEVATOR_PITCH),
        about: text_or(obj.get("about"), DEFAULT_ABOUT),
        skills: skills(obj.get("skills")),
        highlighted_projects: projects(obj.get("highlightedProjects")),
        section_blocks: section_blocks(obj.get("sectionBlocks")),
        theme: theme(obj.get("theme")),
        cta: text_or(obj.get("cta"), DEFAULT_CTA),
    }
}

/// Convenience for a recovered object map.
pub fn normalize_object(obj: Map<String, Value>) -> GeneratedPortfolio {
    normalize_portfolio(&Value::Object(obj))
}

fn trimmed(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    trimmed(value).unwrap_or_else(|| default.to_string())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| trimmed(Some(item))).collect())
        .unwrap_or_default()
}

fn list_or(value: Option<&Value>, default: &[&str]) -> Vec<String> {
    let list = string_list(value);
    if list.is_empty() {
        default.iter().map(|s| s.to_string()).collect()
    } else {
        list
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn skills(value: Option<&Value>) -> Vec<String> {
    list_or(value, &DEFAULT_SKILLS)
}

fn projects(value: Option<&Value>) -> Vec<Project> {
    let projects: Vec<Project> = objects(value)
        .map(|p| Project {
            name: text_or(p.get("name"), DEFAULT_PROJECT_NAME),
            summary: text_or(p.get("summary"), DEFAULT_PROJECT_SUMMARY),
            stack: list_or(p.get("stack"), &DEFAULT_PROJECT_STACK),
            impact: text_or(p.get("impact"), DEFAULT_PROJECT_IMPACT),
            image_url: trimmed(p.get("imageUrl")),
            game_url: trimmed(p.get("gameUrl")),
        })
        .collect();

    if projects.is_empty() {
        vec![default_project()]
    } else {
        projects
    }
}

fn default_project() -> Project {
    Project {
        name: DEFAULT_PROJECT_NAME.to_string(),
        summary: DEFAULT_PROJECT_SUMMARY.to_string(),
        stack: DEFAULT_PROJECT_STACK.iter().map(|s| s.to_string()).collect(),
        impact: DEFAULT_PROJECT_IMPACT.to_string(),
        image_url: None,
        game_url: None,
    }
}

fn section_blocks(value: Option<&Value>) -> Vec<SectionBlock> {
    let blocks: Vec<SectionBlock> = objects(value)
        .map(|b| SectionBlock {
            title: text_or(b.get("title"), DEFAULT_SECTION_TITLE),
            body: text_or(b.get("body"), DEFAULT_SECTION_BODY),
        })
        .collect();

    if blocks.is_empty() {
        vec![SectionBlock {
            title: DEFAULT_SECTION_TITLE.to_string(),
            body: DEFAULT_SECTION_BODY.to_string(),
        }]
    } else {
        blocks
    }
}

fn theme(value: Option<&Value>) -> Theme {
    let Some(t) = value.and_then(Value::as_object) else {
        return default_theme();
    };

    Theme {
        bg: text_or(t.get("bg"), DEFAULT_THEME_BG),
        bg_surface: text_or(t.get("bgSurface"), DEFAULT_THEME_BG_SURFACE),
        ink: text_or(t.get("ink"), DEFAULT_THEME_INK),
        accent: text_or(t.get("accent"), DEFAULT_THEME_ACCENT),
        font_body: text_or(t.get("fontBody"), DEFAULT_THEME_FONT_BODY),
        font_display: text_or(t.get("fontDisplay"), DEFAULT_THEME_FONT_DISPLAY),
        radius: text_or(t.get("radius"), DEFAULT_THEME_RADIUS),
    }
}
