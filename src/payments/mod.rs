// src/payments/mod.rs

//! Checkout creation and the provider webhook that records payments.

pub mod checkout;
pub mod types;
pub mod webhook;

pub use checkout::{CheckoutClient, CheckoutError, CheckoutGateway, CheckoutSettings};
pub use types::{CheckoutSession, PaymentRecord};
pub use webhook::{WebhookError, WebhookOutcome, WebhookSettings};

/// Price the portfolio for `user_id` and open a checkout session for it.
pub async fn start_checkout(
    gateway: &dyn CheckoutGateway,
    settings: &CheckoutSettings,
    user_id: &str,
    discounted: bool,
) -> Result<CheckoutSession, CheckoutError> {
    let amount_cents = settings.price_for(discounted);
    let (id, url) = gateway
        .create_session(user_id, amount_cents, &settings.currency)
        .await?;

    Ok(CheckoutSession {
        id,
        url,
        amount_cents,
        discounted,
    })
}
