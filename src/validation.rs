// src/validation.rs
// Input checks applied before any external call is made

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed for {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Trimmed, non-empty text of at most `max_chars` characters.
pub fn required_text(field: &'static str, value: &str, max_chars: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    bounded(field, trimmed, max_chars)
}

/// Like [`required_text`] but blank input becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => bounded(field, trimmed, max_chars).map(Some),
    }
}

fn bounded(field: &'static str, value: &str, max_chars: usize) -> Result<String, ValidationError> {
    let len = value.chars().count();
    if len > max_chars {
        return Err(ValidationError::new(
            field,
            format!("is {len} characters, limit is {max_chars}"),
        ));
    }
    Ok(value.to_string())
}
