// src/site/slug.rs
// Public URL slugs: lowercase [a-z0-9-], 3-40 chars, no hyphen at either end

use crate::validation::ValidationError;

pub const MIN_SLUG_CHARS: usize = 3;
pub const MAX_SLUG_CHARS: usize = 40;

/// Trim and lowercase. Does not validate.
pub fn normalize_slug(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_slug(raw: &str) -> Result<String, ValidationError> {
    let slug = normalize_slug(raw);

    if !(MIN_SLUG_CHARS..=MAX_SLUG_CHARS).contains(&slug.len()) {
        return Err(ValidationError::new(
            "slug",
            format!("must be {MIN_SLUG_CHARS}-{MAX_SLUG_CHARS} characters"),
        ));
    }
    if !slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
        return Err(ValidationError::new(
            "slug",
            "may only contain lowercase letters, digits and hyphens",
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ValidationError::new("slug", "must not start or end with a hyphen"));
    }
    Ok(slug)
}
