// src/store/mod.rs

//! Repository traits for everything the service persists.
//! Business logic only talks to these; no direct DB calls elsewhere.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::bargain::BargainSession;
use crate::payments::PaymentRecord;
use crate::portfolio::{Brief, GeneratedPortfolio, PortfolioDocument, PublishedSite, RevisionMessage};
use crate::relay::{StreamKind, StreamRecord, StreamState};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stream {0} not found")]
    StreamNotFound(String),

    #[error("stream {0} is already finished and accepts no further appends")]
    StreamClosed(String),

    #[error("slug '{0}' is already taken")]
    SlugTaken(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored document is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only text records that a polling client reads while a
/// generation is in flight.
#[async_trait]
pub trait StreamStore: Send + Sync {
    async fn create_stream(&self, owner: &str, kind: StreamKind) -> StoreResult<StreamRecord>;

    /// Append `text` and optionally move the record into a terminal state.
    /// Records already in a terminal state reject the append with
    /// [`StoreError::StreamClosed`].
    async fn append_chunk(&self, id: &str, text: &str, finish: Option<StreamState>) -> StoreResult<()>;

    async fn get_stream(&self, id: &str) -> StoreResult<Option<StreamRecord>>;

    /// Most recently created record of `kind` for `owner`.
    async fn latest_stream(&self, owner: &str, kind: StreamKind) -> StoreResult<Option<StreamRecord>>;
}

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn save_brief(&self, user_id: &str, brief: &Brief) -> StoreResult<()>;

    async fn get_brief(&self, user_id: &str) -> StoreResult<Option<Brief>>;

    async fn save_portfolio(&self, user_id: &str, portfolio: &GeneratedPortfolio) -> StoreResult<PortfolioDocument>;

    async fn get_portfolio(&self, user_id: &str) -> StoreResult<Option<PortfolioDocument>>;

    async fn append_revision_message(&self, user_id: &str, message: &RevisionMessage) -> StoreResult<()>;

    /// Last `limit` revision messages, oldest first.
    async fn recent_revision_messages(&self, user_id: &str, limit: usize) -> StoreResult<Vec<RevisionMessage>>;

    /// Publish `portfolio` under `slug`. A user owns at most one slug;
    /// publishing again replaces the previous one.
    async fn publish(&self, user_id: &str, slug: &str, portfolio: &GeneratedPortfolio) -> StoreResult<PublishedSite>;

    async fn get_published(&self, slug: &str) -> StoreResult<Option<PublishedSite>>;
}

#[async_trait]
pub trait BargainStore: Send + Sync {
    /// Store `session` as the user's only session, discarding older ones.
    async fn replace_session(&self, session: &BargainSession) -> StoreResult<()>;

    async fn get_session(&self, user_id: &str) -> StoreResult<Option<BargainSession>>;

    async fn save_session(&self, session: &BargainSession) -> StoreResult<()>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert unless a payment with the same external id exists.
    /// Returns whether a row was inserted.
    async fn record_payment(&self, payment: &PaymentRecord) -> StoreResult<bool>;

    async fn has_paid(&self, user_id: &str) -> StoreResult<bool>;
}
