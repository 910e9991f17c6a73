// src/config/mod.rs
// Load all values from the environment (.env first), with per-key defaults

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::bargain::BargainSettings;
use crate::llm::LlmSettings;
use crate::payments::{CheckoutSettings, WebhookSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct FolioConfig {
    // ── LLM Provider
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_completions_path: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_timeout: u64,

    // ── Database
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Server
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub public_url: String,

    // ── Streaming
    pub stream_flush_ms: u64,

    // ── Payments
    pub payment_api_key: String,
    pub payment_base_url: String,
    pub payment_webhook_secret: String,
    pub payment_webhook_tolerance: u64,
    pub payment_price_cents: i64,
    pub payment_discount_percent: i64,
    pub payment_currency: String,

    // ── Negotiation
    pub bargain_message_limit: u32,
}

// Values may carry trailing comments and whitespace; both are stripped.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl FolioConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        Self {
            llm_api_key: env_var_or("LLM_API_KEY", String::new()),
            llm_base_url: env_var_or("LLM_BASE_URL", "https://openrouter.ai/api".to_string()),
            llm_completions_path: env_var_or(
                "LLM_COMPLETIONS_PATH",
                "/v1/chat/completions".to_string(),
            ),
            llm_model: env_var_or("LLM_MODEL", "openai/gpt-4o-mini".to_string()),
            llm_max_tokens: env_var_or("LLM_MAX_TOKENS", 4096),
            llm_temperature: env_var_or("LLM_TEMPERATURE", 0.7),
            llm_timeout: env_var_or("LLM_TIMEOUT_SECS", 120),
            database_url: env_var_or("DATABASE_URL", "sqlite:./folio.db?mode=rwc".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 5),
            host: env_var_or("FOLIO_HOST", "0.0.0.0".to_string()),
            port: env_var_or("FOLIO_PORT", 3001),
            log_level: env_var_or("FOLIO_LOG_LEVEL", "info".to_string()),
            public_url: env_var_or("FOLIO_PUBLIC_URL", "http://localhost:3001".to_string()),
            stream_flush_ms: env_var_or("STREAM_FLUSH_MS", 200),
            payment_api_key: env_var_or("PAYMENT_API_KEY", String::new()),
            payment_base_url: env_var_or("PAYMENT_BASE_URL", "https://api.stripe.com".to_string()),
            payment_webhook_secret: env_var_or("PAYMENT_WEBHOOK_SECRET", String::new()),
            payment_webhook_tolerance: env_var_or("PAYMENT_WEBHOOK_TOLERANCE_SECS", 300),
            payment_price_cents: env_var_or("PAYMENT_PRICE_CENTS", 1900),
            payment_discount_percent: env_var_or("PAYMENT_DISCOUNT_PERCENT", 50),
            payment_currency: env_var_or("PAYMENT_CURRENCY", "usd".to_string()),
            bargain_message_limit: env_var_or("BARGAIN_MESSAGE_LIMIT", 50),
        }
    }

    /// Server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tracing level parsed from `log_level`, defaulting to INFO
    pub fn tracing_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.trim()).unwrap_or(tracing::Level::INFO)
    }

    pub fn stream_flush_interval(&self) -> Duration {
        Duration::from_millis(self.stream_flush_ms)
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.llm_api_key.clone(),
            base_url: self.llm_base_url.clone(),
            completions_path: self.llm_completions_path.clone(),
            model: self.llm_model.clone(),
            max_tokens: self.llm_max_tokens,
            temperature: self.llm_temperature,
            timeout: Duration::from_secs(self.llm_timeout),
        }
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            api_key: self.payment_api_key.clone(),
            base_url: self.payment_base_url.clone(),
            public_url: self.public_url.clone(),
            price_cents: self.payment_price_cents,
            discount_percent: self.payment_discount_percent,
            currency: self.payment_currency.clone(),
        }
    }

    pub fn webhook_settings(&self) -> WebhookSettings {
        WebhookSettings {
            secret: self.payment_webhook_secret.clone(),
            tolerance: Duration::from_secs(self.payment_webhook_tolerance),
        }
    }

    pub fn bargain_settings(&self) -> BargainSettings {
        BargainSettings {
            message_limit: self.bargain_message_limit,
            ..BargainSettings::default()
        }
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<FolioConfig> = Lazy::new(FolioConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FolioConfig::from_env();

        assert!(!config.llm_completions_path.is_empty());
        assert!(config.bind_address().contains(':'));
        assert_eq!(
            config.stream_flush_interval(),
            Duration::from_millis(config.stream_flush_ms)
        );
    }

    #[test]
    fn test_env_var_or_strips_comments() {
        // Key is unique to this test so no other test observes it.
        unsafe { std::env::set_var("FOLIO_TEST_COMMENTED", "42 # the answer") };
        let parsed: u32 = env_var_or("FOLIO_TEST_COMMENTED", 7);
        assert_eq!(parsed, 42);

        unsafe { std::env::set_var("FOLIO_TEST_COMMENTED", "not-a-number") };
        let parsed: u32 = env_var_or("FOLIO_TEST_COMMENTED", 7);
        assert_eq!(parsed, 7);

        unsafe { std::env::remove_var("FOLIO_TEST_COMMENTED") };
    }

    #[test]
    fn test_settings_groups() {
        let config = FolioConfig::from_env();

        let llm = config.llm_settings();
        assert_eq!(llm.model, config.llm_model);
        assert!(llm.completions_url().ends_with(&config.llm_completions_path));

        let webhook = config.webhook_settings();
        assert_eq!(webhook.tolerance.as_secs(), config.payment_webhook_tolerance);
    }
}
