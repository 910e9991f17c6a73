// src/payments/webhook.rs

//! Payment provider webhook: signature verification and event handling.
//!
//! The signature header looks like `t=1700000000,v1=<hex>[,v1=<hex>]`. The
//! signed payload is `{t}.{raw body}` under HMAC-SHA256.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use super::PaymentRecord;
use crate::store::{PaymentStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-payment-signature";
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub secret: String,
    pub tolerance: Duration,
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    NotConfigured,

    #[error("missing signature header")]
    MissingSignature,

    #[error("malformed signature header")]
    MalformedSignature,

    #[error("signature timestamp outside tolerance ({age_secs}s)")]
    Stale { age_secs: i64 },

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid event payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Recorded(PaymentRecord),
    /// Same external id seen before; nothing written.
    Duplicate(String),
    Ignored(String),
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => {
                // Undecodable entries can't match; skip them.
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader { timestamp, signatures }),
        _ => Err(WebhookError::MalformedSignature),
    }
}

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Hex signature for `body` at `timestamp`.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    hex::encode(mac_for(secret, timestamp, body).finalize().into_bytes())
}

/// Check `header` against `body`. `now` is unix seconds. Returns the signed
/// timestamp on success.
pub fn verify_signature(
    settings: &WebhookSettings,
    header: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<i64, WebhookError> {
    if settings.secret.is_empty() {
        return Err(WebhookError::NotConfigured);
    }
    let header = parse_header(header.ok_or(WebhookError::MissingSignature)?)?;

    // The timestamp is unauthenticated at this point; any i64 may arrive.
    let age_secs = now.checked_sub(header.timestamp).unwrap_or(i64::MAX);
    if age_secs.unsigned_abs() > settings.tolerance.as_secs() {
        return Err(WebhookError::Stale { age_secs });
    }

    let matched = header.signatures.iter().any(|sig| {
        mac_for(&settings.secret, header.timestamp, body)
            .verify_slice(sig)
            .is_ok()
    });

    if matched {
        Ok(header.timestamp)
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Apply a verified event. Only completed checkouts are acted on.
pub async fn handle_event(store: &dyn PaymentStore, body: &[u8]) -> Result<WebhookOutcome, WebhookError> {
    let event: Value = serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
    let event_type = event
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::InvalidPayload("missing event type".into()))?;

    if event_type != CHECKOUT_COMPLETED {
        info!("Ignoring webhook event {}", event_type);
        return Ok(WebhookOutcome::Ignored(event_type.to_string()));
    }

    let object = event
        .pointer("/data/object")
        .ok_or_else(|| WebhookError::InvalidPayload("missing data.object".into()))?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let external_id = text("id").ok_or_else(|| WebhookError::InvalidPayload("missing session id".into()))?;
    let user_id = text("client_reference_id")
        .ok_or_else(|| WebhookError::InvalidPayload("missing client_reference_id".into()))?;

    let created_at = event
        .get("created")
        .and_then(Value::as_i64)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now);

    let payment = PaymentRecord {
        external_id: external_id.to_string(),
        user_id: user_id.to_string(),
        amount_cents: object.get("amount_total").and_then(Value::as_i64).unwrap_or(0),
        currency: text("currency").unwrap_or_default().to_lowercase(),
        created_at,
    };

    if store.record_payment(&payment).await? {
        info!("Recorded payment {} for {}", payment.external_id, payment.user_id);
        Ok(WebhookOutcome::Recorded(payment))
    } else {
        warn!("Duplicate webhook delivery for {}", payment.external_id);
        Ok(WebhookOutcome::Duplicate(payment.external_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    fn settings() -> WebhookSettings {
        WebhookSettings {
            secret: SECRET.into(),
            tolerance: Duration::from_secs(300),
        }
    }

    fn header(timestamp: i64, body: &[u8]) -> String {
        format!("t={},v1={}", timestamp, sign(SECRET, timestamp, body))
    }

    fn completed_event(id: &str) -> Vec<u8> {
        json!({
            "type": "checkout.session.completed",
            "created": NOW,
            "data": {"object": {
                "id": id,
                "client_reference_id": "u1",
                "amount_total": 950,
                "currency": "USD"
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = b"{\"type\":\"x\"}";
        let ts = verify_signature(&settings(), Some(&header(NOW - 10, body)), body, NOW).unwrap();
        assert_eq!(ts, NOW - 10);
    }

    #[test]
    fn test_stale_signature_rejected_even_if_valid() {
        let body = b"{}";
        let err = verify_signature(&settings(), Some(&header(NOW - 301, body)), body, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::Stale { age_secs: 301 }));

        let err = verify_signature(&settings(), Some(&header(NOW + 301, body)), body, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::Stale { .. }));

        assert!(verify_signature(&settings(), Some(&header(NOW - 300, body)), body, NOW).is_ok());
    }

    #[test]
    fn test_extreme_timestamps_are_stale() {
        let s = settings();
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
            "t=-1,v1=00",
        ] {
            assert!(
                matches!(verify_signature(&s, Some(header), b"{}", NOW), Err(WebhookError::Stale { .. })),
                "{header}"
            );
        }
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signed = header(NOW, b"{\"amount\":1}");
        let err = verify_signature(&settings(), Some(&signed), b"{\"amount\":2}", NOW).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_any_v1_entry_may_match() {
        let body = b"{}";
        let signed = format!("t={NOW},v1=deadbeef,v1=zz,v1={}", sign(SECRET, NOW, body));
        assert!(verify_signature(&settings(), Some(&signed), body, NOW).is_ok());
    }

    #[test]
    fn test_header_problems() {
        let s = settings();
        assert!(matches!(verify_signature(&s, None, b"{}", NOW), Err(WebhookError::MissingSignature)));
        assert!(matches!(
            verify_signature(&s, Some("v1=abcd"), b"{}", NOW),
            Err(WebhookError::MalformedSignature)
        ));
        assert!(matches!(
            verify_signature(&s, Some("t=abc,v1=abcd"), b"{}", NOW),
            Err(WebhookError::MalformedSignature)
        ));

        let unconfigured = WebhookSettings {
            secret: String::new(),
            tolerance: Duration::from_secs(300),
        };
        assert!(matches!(
            verify_signature(&unconfigured, Some(&header(NOW, b"{}")), b"{}", NOW),
            Err(WebhookError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_completed_checkout_recorded_once() {
        let store = MemoryStore::new();
        let body = completed_event("cs_1");

        match handle_event(&store, &body).await.unwrap() {
            WebhookOutcome::Recorded(p) => {
                assert_eq!(p.external_id, "cs_1");
                assert_eq!(p.user_id, "u1");
                assert_eq!(p.amount_cents, 950);
                assert_eq!(p.currency, "usd");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            handle_event(&store, &body).await.unwrap(),
            WebhookOutcome::Duplicate("cs_1".into())
        );
        assert_eq!(store.payments().len(), 1);
    }

    #[tokio::test]
    async fn test_other_events_ignored() {
        let store = MemoryStore::new();
        let body = json!({"type": "invoice.paid", "data": {"object": {}}}).to_string();
        assert_eq!(
            handle_event(&store, body.as_bytes()).await.unwrap(),
            WebhookOutcome::Ignored("invoice.paid".into())
        );
        assert!(store.payments().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_rejected() {
        let store = MemoryStore::new();
        let body = json!({
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_2"}}
        })
        .to_string();
        let err = handle_event(&store, body.as_bytes()).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));
    }
}
