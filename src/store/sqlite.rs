// src/store/sqlite.rs

//! Implements the store traits on SQLite via sqlx.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::{BargainStore, PaymentStore, PortfolioStore, StoreError, StoreResult, StreamStore};
use crate::bargain::{BargainMessage, BargainSession};
use crate::payments::PaymentRecord;
use crate::portfolio::{
    Brief, GeneratedPortfolio, PortfolioDocument, PublishedSite, RevisionMessage, RevisionRole,
};
use crate::relay::{StreamKind, StreamRecord, StreamState};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `database_url` and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        let options = if in_memory {
            // Every connection to :memory: is its own database; keep exactly one alive.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
        };

        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
        info!("Migrations complete");
        Ok(())
    }

    fn stream_from_row(row: &SqliteRow) -> StoreResult<StreamRecord> {
        let kind: String = row.try_get("kind")?;
        let state: String = row.try_get("state")?;
        let chunk_count: i64 = row.try_get("chunk_count")?;

        Ok(StreamRecord {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            kind: StreamKind::parse(&kind).unwrap_or(StreamKind::Generation),
            text: row.try_get("text")?,
            state: StreamState::parse(&state).unwrap_or(StreamState::Error),
            chunk_count: chunk_count.max(0) as u32,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn site_from_row(row: &SqliteRow) -> StoreResult<PublishedSite> {
        let json: String = row.try_get("portfolio_json")?;
        Ok(PublishedSite {
            slug: row.try_get("slug")?,
            user_id: row.try_get("user_id")?,
            portfolio: serde_json::from_str(&json)?,
            published_at: row.try_get("published_at")?,
        })
    }

    fn session_from_row(row: &SqliteRow) -> StoreResult<BargainSession> {
        let messages_json: String = row.try_get("messages_json")?;
        let messages: Vec<BargainMessage> = serde_json::from_str(&messages_json)?;
        let mood: i64 = row.try_get("mood")?;
        let message_count: i64 = row.try_get("message_count")?;

        Ok(BargainSession {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            mood: mood as i32,
            messages,
            message_count: message_count.max(0) as u32,
            discount_unlocked: row.try_get("discount_unlocked")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl StreamStore for SqliteStore {
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

        sqlx::query(
            r#"
            INSERT INTO streams (id, owner, kind, text, state, chunk_count, created_at, updated_at)
            VALUES (?, ?, ?, '', ?, 0, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner)
        .bind(kind.as_str())
        .bind(record.state.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn append_chunk(&self, id: &str, text: &str, finish: Option<StreamState>) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE streams
            SET text = text || ?,
                chunk_count = chunk_count + 1,
                state = COALESCE(?, state),
                updated_at = ?
            WHERE id = ? AND state = 'streaming'
            "#,
        )
        .bind(text)
        .bind(finish.map(|s| s.as_str()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM streams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Err(match exists {
            Some(_) => StoreError::StreamClosed(id.to_string()),
            None => StoreError::StreamNotFound(id.to_string()),
        })
    }

    async fn get_stream(&self, id: &str) -> StoreResult<Option<StreamRecord>> {
        let row = sqlx::query("SELECT * FROM streams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::stream_from_row).transpose()
    }

    async fn latest_stream(&self, owner: &str, kind: StreamKind) -> StoreResult<Option<StreamRecord>> {
        let row = sqlx::query(
            "SELECT * FROM streams WHERE owner = ? AND kind = ? ORDER BY rowid DESC LIMIT 1",
        )
        .bind(owner)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::stream_from_row).transpose()
    }
}

#[async_trait]
impl PortfolioStore for SqliteStore {
    async fn save_brief(&self, user_id: &str, brief: &Brief) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO briefs (user_id, brief_json, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET brief_json = excluded.brief_json, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(serde_json::to_string(brief)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_brief(&self, user_id: &str) -> StoreResult<Option<Brief>> {
        let json: Option<String> = sqlx::query_scalar("SELECT brief_json FROM briefs WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    async fn save_portfolio(&self, user_id: &str, portfolio: &GeneratedPortfolio) -> StoreResult<PortfolioDocument> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO portfolios (user_id, portfolio_json, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET portfolio_json = excluded.portfolio_json, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(serde_json::to_string(portfolio)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(PortfolioDocument {
            user_id: user_id.to_string(),
            portfolio: portfolio.clone(),
            updated_at: now,
        })
    }

    async fn get_portfolio(&self, user_id: &str) -> StoreResult<Option<PortfolioDocument>> {
        let row = sqlx::query("SELECT portfolio_json, updated_at FROM portfolios WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.try_get("portfolio_json")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Some(PortfolioDocument {
            user_id: user_id.to_string(),
            portfolio: serde_json::from_str(&json)?,
            updated_at,
        }))
    }

    async fn append_revision_message(&self, user_id: &str, message: &RevisionMessage) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO revision_messages (user_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_revision_messages(&self, user_id: &str, limit: usize) -> StoreResult<Vec<RevisionMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT role, content, created_at FROM revision_messages
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            let role: String = row.try_get("role")?;
            messages.push(RevisionMessage {
                role: RevisionRole::parse(&role).unwrap_or(RevisionRole::Assistant),
                content: row.try_get("content")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(messages)
    }

    async fn publish(&self, user_id: &str, slug: &str, portfolio: &GeneratedPortfolio) -> StoreResult<PublishedSite> {
        let site = PublishedSite {
            slug: slug.to_string(),
            user_id: user_id.to_string(),
            portfolio: portfolio.clone(),
            published_at: Utc::now(),
        };
        let json = serde_json::to_string(portfolio)?;

        let mut tx = self.pool.begin().await?;

        let owner: Option<String> = sqlx::query_scalar("SELECT user_id FROM published_sites WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *tx)
            .await?;
        if owner.is_some_and(|o| o != user_id) {
            return Err(StoreError::SlugTaken(slug.to_string()));
        }

        sqlx::query("DELETE FROM published_sites WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO published_sites (slug, user_id, portfolio_json, published_at) VALUES (?, ?, ?, ?)",
        )
        .bind(slug)
        .bind(user_id)
        .bind(&json)
        .bind(site.published_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::SlugTaken(slug.to_string())
            } else {
                StoreError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(site)
    }

    async fn get_published(&self, slug: &str) -> StoreResult<Option<PublishedSite>> {
        let row = sqlx::query("SELECT * FROM published_sites WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::site_from_row).transpose()
    }
}

#[async_trait]
impl BargainStore for SqliteStore {
    async fn replace_session(&self, session: &BargainSession) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bargain_sessions WHERE user_id = ?")
            .bind(&session.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO bargain_sessions (
                id, user_id, mood, message_count, discount_unlocked, messages_json, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.mood)
        .bind(session.message_count as i64)
        .bind(session.discount_unlocked)
        .bind(serde_json::to_string(&session.messages)?)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_session(&self, user_id: &str) -> StoreResult<Option<BargainSession>> {
        let row = sqlx::query(
            "SELECT * FROM bargain_sessions WHERE user_id = ? ORDER BY rowid DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn save_session(&self, session: &BargainSession) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE bargain_sessions
            SET mood = ?, message_count = ?, discount_unlocked = ?, messages_json = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(session.mood)
        .bind(session.message_count as i64)
        .bind(session.discount_unlocked)
        .bind(serde_json::to_string(&session.messages)?)
        .bind(session.updated_at)
        .bind(&session.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for SqliteStore {
    async fn record_payment(&self, payment: &PaymentRecord) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (external_id, user_id, amount_cents, currency, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO NOTHING
            "#,
        )
        .bind(&payment.external_id)
        .bind(&payment.user_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn has_paid(&self, user_id: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}
