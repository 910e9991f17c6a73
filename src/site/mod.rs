// src/site/mod.rs
// Published portfolio pages

pub mod render;
pub mod sanitize;
pub mod slug;

pub use render::render_page;
pub use slug::{normalize_slug, validate_slug};

/// Pages carry no script and load nothing but styles, images and fonts.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; style-src 'unsafe-inline'; img-src http: https:; font-src http: https:; base-uri 'none'; form-action 'none'; frame-ancestors 'none'";
