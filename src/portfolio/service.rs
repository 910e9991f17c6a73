// src/portfolio/service.rs

//! Generation orchestrator.
//!
//! One call = one stream record, one upstream request and one sequential
//! read loop. Input is validated before anything external happens; the
//! final text goes through extraction and normalization before it is saved.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use super::normalize::normalize_object;
use super::prompt;
use super::types::{PortfolioDocument, RevisionMessage, RevisionRole};
use crate::extract::{extract_json_object, ExtractError};
use crate::llm::{CompletionProvider, CompletionRequest, UpstreamError};
use crate::relay::{RelayError, StreamKind, StreamRelay};
use crate::store::{PortfolioStore, StoreError, StreamStore};
use crate::validation::{required_text, ValidationError};

pub const MAX_INSTRUCTION_CHARS: usize = 2000;

const REVISION_ACK: &str = "Done. I've updated your portfolio with that change.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no brief saved yet; save one before generating")]
    NoBrief,

    #[error("no portfolio generated yet")]
    NoPortfolio,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RelayError> for GenerationError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Upstream(e) => GenerationError::Upstream(e),
            RelayError::Store(e) => GenerationError::Store(e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub stream_id: String,
    pub document: PortfolioDocument,
}

/// Cheap to clone; every handle inside is shared.
#[derive(Clone)]
pub struct PortfolioService {
    store: Arc<dyn PortfolioStore>,
    streams: Arc<dyn StreamStore>,
    llm: Arc<dyn CompletionProvider>,
    flush_interval: Duration,
}

impl PortfolioService {
    pub fn new(
        store: Arc<dyn PortfolioStore>,
        streams: Arc<dyn StreamStore>,
        llm: Arc<dyn CompletionProvider>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            store,
            streams,
            llm,
            flush_interval,
        }
    }

    /// First draft from the saved brief.
    pub async fn generate(&self, user_id: &str) -> Result<GenerationOutcome, GenerationError> {
        let brief = self
            .store
            .get_brief(user_id)
            .await?
            .ok_or(GenerationError::NoBrief)?;

        info!("Generating portfolio for {}", user_id);
        let request = prompt::generation_request(&brief);
        let (stream_id, text) = self.run(user_id, StreamKind::Generation, request).await?;

        let portfolio = normalize_object(extract_json_object(&text)?);
        let document = self.store.save_portfolio(user_id, &portfolio).await?;

        Ok(GenerationOutcome { stream_id, document })
    }

    /// Apply a chat instruction to the current portfolio.
    pub async fn revise(&self, user_id: &str, instruction: &str) -> Result<GenerationOutcome, GenerationError> {
        let instruction = required_text("instruction", instruction, MAX_INSTRUCTION_CHARS)?;
        let current = self
            .store
            .get_portfolio(user_id)
            .await?
            .ok_or(GenerationError::NoPortfolio)?;
        let history = self
            .store
            .recent_revision_messages(user_id, prompt::REVISION_HISTORY)
            .await?;

        info!("Revising portfolio for {}", user_id);
        let request = prompt::revision_request(&current.portfolio, &history, &instruction);
        let (stream_id, text) = self.run(user_id, StreamKind::Revision, request).await?;

        let portfolio = normalize_object(extract_json_object(&text)?);
        let document = self.store.save_portfolio(user_id, &portfolio).await?;

        for (role, content) in [(RevisionRole::User, instruction), (RevisionRole::Assistant, REVISION_ACK.to_string())] {
            let message = RevisionMessage {
                role,
                content,
                created_at: Utc::now(),
            };
            self.store.append_revision_message(user_id, &message).await?;
        }

        Ok(GenerationOutcome { stream_id, document })
    }

    /// Stream one completion into a fresh record; returns its id and the full text.
    async fn run(
        &self,
        user_id: &str,
        kind: StreamKind,
        request: CompletionRequest,
    ) -> Result<(String, String), GenerationError> {
        let record = self.streams.create_stream(user_id, kind).await?;
        let relay = StreamRelay::new(self.streams.clone(), record.id.clone(), self.flush_interval);

        let chunks = match self.llm.stream(request).await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!("{} request failed for {}: {}", kind.as_str(), user_id, e);
                relay.fail(&e.to_string()).await?;
                return Err(e.into());
            }
        };

        let text = relay.pump(chunks).await?;
        Ok((record.id, text))
    }
}
