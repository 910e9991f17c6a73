// src/payments/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed payment, keyed by the provider's transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub external_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub amount_cents: i64,
    pub discounted: bool,
}
