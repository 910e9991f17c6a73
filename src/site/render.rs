// src/site/render.rs
// Static HTML for a published portfolio. No scripts; all styling inline.

use std::fmt::Write;

use crate::portfolio::{GeneratedPortfolio, Project};

use super::sanitize::{escape_attr, escape_text, safe_url, sanitize_theme};

fn stylesheet(portfolio: &GeneratedPortfolio) -> String {
    let t = sanitize_theme(&portfolio.theme);
    format!(
        r#":root {{ --bg: {bg}; --surface: {surface}; --ink: {ink}; --accent: {accent}; --radius: {radius}; }}
* {{ box-sizing: border-box; }}
body {{ margin: 0; background: var(--bg); color: var(--ink); font-family: "{body}", system-ui, sans-serif; line-height: 1.6; }}
main {{ max-width: 960px; margin: 0 auto; padding: 64px 24px; }}
h1, h2, h3 {{ font-family: "{display}", "{body}", system-ui, sans-serif; line-height: 1.2; }}
h1 {{ font-size: 2.75rem; margin: 0 0 16px; }}
.pitch {{ font-size: 1.25rem; opacity: 0.85; }}
.card {{ background: var(--surface); border-radius: var(--radius); padding: 24px; margin: 16px 0; }}
.card img {{ max-width: 100%; border-radius: var(--radius); }}
.skills {{ display: flex; flex-wrap: wrap; gap: 8px; padding: 0; list-style: none; }}
.skills li {{ border: 1px solid var(--accent); border-radius: var(--radius); padding: 4px 12px; }}
.stack {{ color: var(--accent); font-size: 0.9rem; }}
a {{ color: var(--accent); }}
.cta {{ font-size: 1.5rem; text-align: center; padding: 48px 0; }}"#,
        bg = t.bg,
        surface = t.bg_surface,
        ink = t.ink,
        accent = t.accent,
        radius = t.radius,
        body = t.font_body,
        display = t.font_display,
    )
}

fn render_project(out: &mut String, project: &Project) {
    out.push_str("<article class=\"card\">");
    if let Some(src) = project.image_url.as_deref().and_then(safe_url) {
        let _ = write!(out, "<img src=\"{}\" alt=\"{}\">", escape_attr(&src), escape_attr(&project.name));
    }
    let _ = write!(
        out,
        "<h3>{}</h3><p>{}</p><p class=\"stack\">{}</p><p>{}</p>",
        escape_text(&project.name),
        escape_text(&project.summary),
        escape_text(&project.stack.join(" · ")),
        escape_text(&project.impact),
    );
    if let Some(href) = project.game_url.as_deref().and_then(safe_url) {
        let _ = write!(
            out,
            "<p><a href=\"{}\" rel=\"noopener noreferrer nofollow\">Try it</a></p>",
            escape_attr(&href)
        );
    }
    out.push_str("</article>");
}

/// Full document for `portfolio`.
pub fn render_page(portfolio: &GeneratedPortfolio) -> String {
    let mut out = String::with_capacity(8 * 1024);

    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <meta name=\"description\" content=\"{}\"><title>{}</title><style>{}</style></head><body><main>",
        escape_attr(&portfolio.elevator_pitch),
        escape_text(&portfolio.headline),
        stylesheet(portfolio),
    );

    let _ = write!(
        out,
        "<header><h1>{}</h1><p class=\"pitch\">{}</p></header>",
        escape_text(&portfolio.headline),
        escape_text(&portfolio.elevator_pitch),
    );

    out.push_str("<section><h2>About</h2>");
    for paragraph in portfolio.about.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let _ = write!(out, "<p>{}</p>", escape_text(paragraph.trim()));
    }
    out.push_str("</section>");

    out.push_str("<section><h2>Skills</h2><ul class=\"skills\">");
    for skill in &portfolio.skills {
        let _ = write!(out, "<li>{}</li>", escape_text(skill));
    }
    out.push_str("</ul></section>");

    out.push_str("<section><h2>Projects</h2>");
    for project in &portfolio.highlighted_projects {
        render_project(&mut out, project);
    }
    out.push_str("</section>");

    for block in &portfolio.section_blocks {
        let _ = write!(
            out,
            "<section class=\"card\"><h2>{}</h2><p>{}</p></section>",
            escape_text(&block.title),
            escape_text(&block.body),
        );
    }

    let _ = write!(out, "<footer class=\"cta\">{}</footer>", escape_text(&portfolio.cta));
    out.push_str("</main></body></html>");
    out
}
