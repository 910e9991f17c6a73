// src/site/sanitize.rs

//! Cleaning model/user-controlled values before they reach the page.
//! Text is entity-escaped, CSS values lose anything that could close a
//! declaration or open a new rule, and only http(s) URLs survive.

use crate::portfolio::Theme;
use crate::portfolio::normalize::default_theme;

const CSS_BREAKOUT: [char; 11] = [';', '{', '}', '(', ')', '<', '>', '\\', '/', '"', '\''];

pub fn escape_text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

/// For values placed inside a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

pub fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !CSS_BREAKOUT.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn font_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .trim()
        .to_string()
}

/// The URL re-serialized if it is absolute http or https, otherwise `None`.
pub fn safe_url(value: &str) -> Option<String> {
    let parsed = url::Url::parse(value.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() { default.to_string() } else { value }
}

/// Every theme field sanitized; empties fall back to the default palette.
pub fn sanitize_theme(theme: &Theme) -> Theme {
    let defaults = default_theme();
    Theme {
        bg: or_default(css_value(&theme.bg), &defaults.bg),
        bg_surface: or_default(css_value(&theme.bg_surface), &defaults.bg_surface),
        ink: or_default(css_value(&theme.ink), &defaults.ink),
        accent: or_default(css_value(&theme.accent), &defaults.accent),
        font_body: or_default(font_name(&theme.font_body), &defaults.font_body),
        font_display: or_default(font_name(&theme.font_display), &defaults.font_display),
        radius: or_default(css_value(&theme.radius), &defaults.radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_breakout_stripped() {
        assert_eq!(css_value("#fff; } body { display:none"), "#fff  body  display:none");
        assert_eq!(css_value("url(javascript:alert(1))"), "urljavascript:alert1");
        assert_eq!(css_value("</style><script>"), "stylescript");
        assert_eq!(css_value(" 12px "), "12px");
    }

    #[test]
    fn test_font_names_restricted() {
        assert_eq!(font_name("Space Grotesk"), "Space Grotesk");
        assert_eq!(font_name("Inter', serif; x"), "Inter serif x");
        assert_eq!(font_name("IBM-Plex_Mono"), "IBM-PlexMono");
    }

    #[test]
    fn test_only_http_urls_survive() {
        assert_eq!(safe_url(" https://ada.dev/img.png ").as_deref(), Some("https://ada.dev/img.png"));
        assert!(safe_url("http://example.com").is_some());
        assert!(safe_url("javascript:alert(1)").is_none());
        assert!(safe_url("data:text/html,hi").is_none());
        assert!(safe_url("/relative/path").is_none());
        assert!(safe_url("ftp://example.com/x").is_none());
    }

    #[test]
    fn test_text_escaped() {
        assert_eq!(escape_text("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
        assert_eq!(escape_attr("a\"b"), "a&quot;b");
    }

    #[test]
    fn test_theme_falls_back_when_emptied() {
        let theme = Theme {
            bg: "();".into(),
            bg_surface: "#111".into(),
            ink: "#eee".into(),
            accent: "red".into(),
            font_body: "<>".into(),
            font_display: "Georgia".into(),
            radius: "8px".into(),
        };
        let clean = sanitize_theme(&theme);
        let defaults = default_theme();
        assert_eq!(clean.bg, defaults.bg);
        assert_eq!(clean.font_body, defaults.font_body);
        assert_eq!(clean.accent, "red");
        assert_eq!(clean.font_display, "Georgia");
    }
}
