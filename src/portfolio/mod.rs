// src/portfolio/mod.rs

pub mod normalize;
pub mod prompt;
pub mod service;
pub mod types;

pub use normalize::{default_theme, normalize_object, normalize_portfolio};
pub use service::{GenerationError, GenerationOutcome, PortfolioService};
pub use types::{
    Brief, GeneratedPortfolio, PortfolioDocument, Project, PublishedSite, RevisionMessage, RevisionRole,
    SectionBlock, Theme,
};
