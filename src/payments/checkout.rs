// src/payments/checkout.rs
// Checkout-session creation against the payment provider.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::validation::ValidationError;

pub const MIN_AMOUNT_CENTS: i64 = 50;
pub const MAX_AMOUNT_CENTS: i64 = 100_000;

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub api_key: String,
    pub base_url: String,
    /// Public origin of this service, used for return URLs
    pub public_url: String,
    pub price_cents: i64,
    pub discount_percent: i64,
    pub currency: String,
}

impl CheckoutSettings {
    /// Price for one portfolio, reduced when the discount was won.
    pub fn price_for(&self, discounted: bool) -> i64 {
        if !discounted {
            return self.price_cents;
        }
        let percent = self.discount_percent.clamp(0, 100);
        self.price_cents - self.price_cents * percent / 100
    }

    pub fn success_url(&self) -> String {
        format!("{}/dashboard?checkout=success", self.public_url.trim_end_matches('/'))
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/dashboard?checkout=cancelled", self.public_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("payment provider is not configured")]
    NotConfigured,

    #[error("payment provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request to payment provider failed: {0}")]
    Transport(String),

    #[error("payment provider returned an unexpected payload: {0}")]
    Malformed(String),
}

/// Validate amount and currency before anything leaves the process.
pub fn validate_charge(amount_cents: i64, currency: &str) -> Result<(), ValidationError> {
    if !(MIN_AMOUNT_CENTS..=MAX_AMOUNT_CENTS).contains(&amount_cents) {
        return Err(ValidationError::new(
            "amount",
            format!("must be between {MIN_AMOUNT_CENTS} and {MAX_AMOUNT_CENTS} cents"),
        ));
    }
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(ValidationError::new("currency", "must be a 3-letter lowercase code"));
    }
    Ok(())
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(
        &self,
        user_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<(String, String), CheckoutError>;
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

pub struct CheckoutClient {
    http: ReqwestClient,
    settings: CheckoutSettings,
}

impl CheckoutClient {
    pub fn new(settings: CheckoutSettings) -> anyhow::Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { http, settings })
    }
}

#[async_trait]
impl CheckoutGateway for CheckoutClient {
    async fn create_session(
        &self,
        user_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<(String, String), CheckoutError> {
        validate_charge(amount_cents, currency)?;
        if self.settings.api_key.trim().is_empty() {
            return Err(CheckoutError::NotConfigured);
        }

        let amount = amount_cents.to_string();
        let success_url = self.settings.success_url();
        let cancel_url = self.settings.cancel_url();
        let params = [
            ("mode", "payment"),
            ("client_reference_id", user_id),
            ("success_url", success_url.as_str()),
            ("cancel_url", cancel_url.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", currency),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            ("line_items[0][price_data][product_data][name]", "Portfolio site"),
        ];

        let url = format!("{}/v1/checkout/sessions", self.settings.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.settings.api_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            warn!("Checkout session creation failed: HTTP {}", status);
            return Err(CheckoutError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| CheckoutError::Malformed(e.to_string()))?;
        let url = session
            .url
            .ok_or_else(|| CheckoutError::Malformed("session has no url".into()))?;

        info!("Created checkout session {} for {} ({} {})", session.id, user_id, amount_cents, currency);
        Ok((session.id, url))
    }
}
