// src/store/memory.rs

//! In-process implementation of every store trait. Used by tests and by
//! `folio serve --memory` for throwaway demos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{BargainStore, PaymentStore, PortfolioStore, StoreError, StoreResult, StreamStore};
use crate::bargain::BargainSession;
use crate::payments::PaymentRecord;
use crate::portfolio::{Brief, GeneratedPortfolio, PortfolioDocument, PublishedSite, RevisionMessage};
use crate::relay::{StreamKind, StreamRecord, StreamState};

#[derive(Default)]
struct Inner {
    streams: Vec<StreamRecord>,
    chunks: HashMap<String, Vec<String>>,
    briefs: HashMap<String, Brief>,
    portfolios: HashMap<String, PortfolioDocument>,
    revisions: HashMap<String, Vec<RevisionMessage>>,
    published: HashMap<String, PublishedSite>,
    bargains: HashMap<String, BargainSession>,
    payments: Vec<PaymentRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted append for `stream_id`, in order.
    pub fn chunks(&self, stream_id: &str) -> Vec<String> {
        self.inner.lock().chunks.get(stream_id).cloned().unwrap_or_default()
    }

    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.inner.lock().payments.clone()
    }
}

#[async_trait]
impl StreamStore for MemoryStore {
    async fn create_stream(&self, owner: &str, kind: StreamKind) -> StoreResult<StreamRecord> {
        let now = Utc::now();
        let record = StreamRecord {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            kind,
            text: String::new(),
            state: StreamState::Streaming,
            chunk_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().streams.push(record.clone());
        Ok(record)
    }

    async fn append_chunk(&self, id: &str, text: &str, finish: Option<StreamState>) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let record = inner
            .streams
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::StreamNotFound(id.to_string()))?;

        if record.state.is_terminal() {
            return Err(StoreError::StreamClosed(id.to_string()));
        }

        record.text.push_str(text);
        record.chunk_count += 1;
        if let Some(state) = finish {
            record.state = state;
        }
        record.updated_at = Utc::now();

        inner.chunks.entry(id.to_string()).or_default().push(text.to_string());
        Ok(())
    }

    async fn get_stream(&self, id: &str) -> StoreResult<Option<StreamRecord>> {
        Ok(self.inner.lock().streams.iter().find(|r| r.id == id).cloned())
    }

    async fn latest_stream(&self, owner: &str, kind: StreamKind) -> StoreResult<Option<StreamRecord>> {
        Ok(self
            .inner
            .lock()
            .streams
            .iter()
            .rev()
            .find(|r| r.owner == owner && r.kind == kind)
            .cloned())
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn save_brief(&self, user_id: &str, brief: &Brief) -> StoreResult<()> {
        self.inner.lock().briefs.insert(user_id.to_string(), brief.clone());
        Ok(())
    }

    async fn get_brief(&self, user_id: &str) -> StoreResult<Option<Brief>> {
        Ok(self.inner.lock().briefs.get(user_id).cloned())
    }

    async fn save_portfolio(&self, user_id: &str, portfolio: &GeneratedPortfolio) -> StoreResult<PortfolioDocument> {
        let doc = PortfolioDocument {
            user_id: user_id.to_string(),
            portfolio: portfolio.clone(),
            updated_at: Utc::now(),
        };
        self.inner.lock().portfolios.insert(user_id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn get_portfolio(&self, user_id: &str) -> StoreResult<Option<PortfolioDocument>> {
        Ok(self.inner.lock().portfolios.get(user_id).cloned())
    }

    async fn append_revision_message(&self, user_id: &str, message: &RevisionMessage) -> StoreResult<()> {
        self.inner
            .lock()
            .revisions
            .entry(user_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn recent_revision_messages(&self, user_id: &str, limit: usize) -> StoreResult<Vec<RevisionMessage>> {
        let inner = self.inner.lock();
        let all = inner.revisions.get(user_id).map(Vec::as_slice).unwrap_or_default();
        Ok(all[all.len().saturating_sub(limit)..].to_vec())
    }

    async fn publish(&self, user_id: &str, slug: &str, portfolio: &GeneratedPortfolio) -> StoreResult<PublishedSite> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.published.get(slug) {
            if existing.user_id != user_id {
                return Err(StoreError::SlugTaken(slug.to_string()));
            }
        }
        inner.published.retain(|_, site| site.user_id != user_id);

        let site = PublishedSite {
            slug: slug.to_string(),
            user_id: user_id.to_string(),
            portfolio: portfolio.clone(),
            published_at: Utc::now(),
        };
        inner.published.insert(slug.to_string(), site.clone());
        Ok(site)
    }

    async fn get_published(&self, slug: &str) -> StoreResult<Option<PublishedSite>> {
        Ok(self.inner.lock().published.get(slug).cloned())
    }
}

#[async_trait]
impl BargainStore for MemoryStore {
    async fn replace_session(&self, session: &BargainSession) -> StoreResult<()> {
        self.inner
            .lock()
            .bargains
            .insert(session.user_id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, user_id: &str) -> StoreResult<Option<BargainSession>> {
        Ok(self.inner.lock().bargains.get(user_id).cloned())
    }

    /// Only overwrites the session with the same id; a replaced one is left alone.
    async fn save_session(&self, session: &BargainSession) -> StoreResult<()> {
        if let Some(current) = self.inner.lock().bargains.get_mut(&session.user_id) {
            if current.id == session.id {
                *current = session.clone();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn record_payment(&self, payment: &PaymentRecord) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        if inner.payments.iter().any(|p| p.external_id == payment.external_id) {
            return Ok(false);
        }
        inner.payments.push(payment.clone());
        Ok(true)
    }

    async fn has_paid(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.inner.lock().payments.iter().any(|p| p.user_id == user_id))
    }
}
