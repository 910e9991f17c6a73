// src/extract/mod.rs

//! Recovers a JSON object from free-form model output.
//!
//! Models wrap JSON in prose, in markdown fences, emit several candidate
//! objects, or leave trailing commas behind. Candidates are produced lazily
//! from most to least literal and the first one that parses as a JSON
//! object wins:
//!
//! 1. the whole text
//! 2. every fenced block, then every balanced object inside that block
//! 3. the span from the first `{` to the last `}`
//! 4. every balanced object in the whole text
//!
//! Each candidate is followed by a copy with trailing commas removed.
//! Identical strings are only tried once.

use std::collections::HashSet;
use std::iter;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of characters of the raw text kept in the error for debugging.
pub const SNIPPET_CHARS: usize = 200;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:json)?[ \t]*\r?\n?(.*?)```").expect("fence regex is valid")
});

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[\]}])").expect("trailing comma regex is valid"));

#[derive(Debug, Error)]
#[error("model output did not contain a parseable JSON object; output began with: {snippet:?}")]
pub struct ExtractError {
    pub snippet: String,
}

impl ExtractError {
    fn from_raw(raw: &str) -> Self {
        Self {
            snippet: raw.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}

/// Return the first candidate in `raw` that parses as a JSON object.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ExtractError> {
    let mut tried: HashSet<String> = HashSet::new();

    candidates(raw)
        .flat_map(|candidate| {
            let relaxed = strip_trailing_commas(&candidate);
            iter::once(candidate).chain(relaxed)
        })
        .filter(|candidate| tried.insert(candidate.clone()))
        .find_map(|candidate| parse_object(&candidate))
        .ok_or_else(|| ExtractError::from_raw(raw))
}

/// Lazily yield candidate substrings in try-order.
pub fn candidates(raw: &str) -> impl Iterator<Item = String> + '_ {
    let whole = iter::once(raw.trim());

    let fenced = fenced_blocks(raw).flat_map(|block| iter::once(block).chain(balanced_objects(block)));

    let outermost = outermost_braces(raw).into_iter();

    whole
        .chain(fenced)
        .chain(outermost)
        .chain(balanced_objects(raw))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Contents of every triple-backtick fence, optionally tagged `json`.
pub fn fenced_blocks(raw: &str) -> impl Iterator<Item = &str> {
    FENCE_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Span from the first `{` to the last `}`, if they are in that order.
pub fn outermost_braces(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Iterate over every top-level balanced `{...}` span in `text`.
pub fn balanced_objects(text: &str) -> BalancedObjects<'_> {
    BalancedObjects { text, pos: 0 }
}

/// Single forward scan tracking brace depth. Braces inside double-quoted
/// strings do not count, and a backslash escapes the next character of a
/// string. Only spans that close back to depth zero are yielded, so two
/// adjacent objects come out as two items.
pub struct BalancedObjects<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for BalancedObjects<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut start = 0usize;

        while self.pos < bytes.len() {
            let i = self.pos;
            let b = bytes[i];
            self.pos += 1;

            if depth == 0 {
                if b == b'{' {
                    depth = 1;
                    start = i;
                }
                continue;
            }

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&self.text[start..=i]);
                    }
                }
                _ => {}
            }
        }

        None
    }
}

/// `Some(relaxed)` when removing commas before `]`/`}` changes the text.
fn strip_trailing_commas(candidate: &str) -> Option<String> {
    let relaxed = TRAILING_COMMA_RE.replace_all(candidate, "$1");
    (relaxed != candidate).then(|| relaxed.into_owned())
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(raw: &str) -> Value {
        Value::Object(extract_json_object(raw).expect("object"))
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(extract(r#"{"a": 1}"#), json!({"a": 1}));
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let raw = "Sure! ```json\n{\"headline\":\"X\",\"skills\":[]}\n```";
        assert_eq!(extract(raw), json!({"headline": "X", "skills": []}));
    }

    #[test]
    fn test_untagged_fence() {
        let raw = "Here you go:\n```\n{\"ok\": true}\n```\nEnjoy.";
        assert_eq!(extract(raw), json!({"ok": true}));
    }

    #[test]
    fn test_object_inside_fence_with_commentary() {
        let raw = "```json\nResult follows {\"k\": \"v\"} as requested\n```";
        assert_eq!(extract(raw), json!({"k": "v"}));
    }

    #[test]
    fn test_nested_braces_inside_strings() {
        let raw = r#"Output: {"code": "fn main() { println!(\"}\"); }", "n": {"m": 2}} done"#;
        assert_eq!(
            extract(raw),
            json!({"code": "fn main() { println!(\"}\"); }", "n": {"m": 2}})
        );
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let raw = r#"text {"quote": "she said \"{hi}\" loudly"} tail"#;
        assert_eq!(extract(raw), json!({"quote": "she said \"{hi}\" loudly"}));
    }

    #[test]
    fn test_multiple_objects_are_not_concatenated() {
        let raw = r#"first {"a": 1} and then {"b": 2}"#;
        // first-to-last brace span is invalid JSON, so the scanner decides
        assert_eq!(extract(raw), json!({"a": 1}));
    }

    #[test]
    fn test_trailing_commas_are_repaired() {
        let raw = "```json\n{\"skills\": [\"a\", \"b\",], \"x\": 1,}\n```";
        assert_eq!(extract(raw), json!({"skills": ["a", "b"], "x": 1}));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = extract_json_object("").unwrap_err();
        assert!(err.snippet.is_empty());
    }

    #[test]
    fn test_array_is_rejected() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_array_falls_through_to_embedded_object() {
        let raw = r#"[{"inner": true}]"#;
        assert_eq!(extract(raw), json!({"inner": true}));
    }

    #[test]
    fn test_error_snippet_is_bounded() {
        let raw = "x".repeat(1000);
        let err = extract_json_object(&raw).unwrap_err();
        assert_eq!(err.snippet.chars().count(), SNIPPET_CHARS);
        assert!(err.to_string().contains("xxxx"));
    }

    #[test]
    fn test_balanced_objects_yields_each_top_level_object() {
        let found: Vec<&str> = balanced_objects(r#"a {"x":{"y":1}} b {"z":"}"} {unclosed"#).collect();
        assert_eq!(found, vec![r#"{"x":{"y":1}}"#, r#"{"z":"}"}"#]);
    }

    #[test]
    fn test_candidate_order() {
        let raw = "pre ```json\n{\"a\":1}\n``` post {\"b\":2}";
        let order: Vec<String> = candidates(raw).collect();
        assert_eq!(order[0], raw.trim());
        assert_eq!(order[1], "{\"a\":1}");
        assert!(order.iter().any(|c| c == "{\"b\":2}"));
    }

    #[test]
    fn test_embedded_object_recovered_exactly() {
        let object = json!({
            "headline": "Builder of things",
            "skills": ["Rust", "SQL"],
            "theme": {"bg": "#fff"}
        });
        for wrapper in [
            "Here is your JSON:\n{}\nLet me know!",
            "```json\n{}\n```",
            "Some {braces} in prose, then {} and more text.",
        ] {
            let raw = wrapper.replacen("{}", &object.to_string(), 1);
            assert_eq!(extract(&raw), object, "wrapper: {wrapper}");
        }
    }
}
