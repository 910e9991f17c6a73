// src/state.rs
// Shared handles for the HTTP handlers

use std::sync::Arc;
use std::time::Duration;

use crate::{
    bargain::{BargainService, BargainSettings},
    llm::CompletionProvider,
    payments::{CheckoutGateway, CheckoutSettings, WebhookSettings},
    portfolio::PortfolioService,
    store::{BargainStore, PaymentStore, PortfolioStore, StreamStore},
};

pub struct AppState {
    // -------- Storage --------
    pub portfolio_store: Arc<dyn PortfolioStore>,
    pub stream_store: Arc<dyn StreamStore>,
    pub payment_store: Arc<dyn PaymentStore>,
    pub bargain_store: Arc<dyn BargainStore>,

    // -------- Services --------
    pub portfolio_service: PortfolioService,
    pub bargain_service: BargainService,

    // -------- Payments --------
    pub checkout: Arc<dyn CheckoutGateway>,
    pub checkout_settings: CheckoutSettings,
    pub webhook_settings: WebhookSettings,

    pub model: String,
}

/// Everything besides the store and the two external clients.
#[derive(Debug, Clone)]
pub struct StateSettings {
    pub flush_interval: Duration,
    pub bargain: BargainSettings,
    pub checkout: CheckoutSettings,
    pub webhook: WebhookSettings,
    pub model: String,
}

impl AppState {
    /// Wire services around one store that backs every repository trait.
    pub fn new<S>(
        store: Arc<S>,
        llm: Arc<dyn CompletionProvider>,
        checkout: Arc<dyn CheckoutGateway>,
        settings: StateSettings,
    ) -> Self
    where
        S: PortfolioStore + StreamStore + PaymentStore + BargainStore + 'static,
    {
        let portfolio_store: Arc<dyn PortfolioStore> = store.clone();
        let stream_store: Arc<dyn StreamStore> = store.clone();
        let payment_store: Arc<dyn PaymentStore> = store.clone();
        let bargain_store: Arc<dyn BargainStore> = store;

        let portfolio_service = PortfolioService::new(
            portfolio_store.clone(),
            stream_store.clone(),
            llm.clone(),
            settings.flush_interval,
        );
        let bargain_service = BargainService::new(bargain_store.clone(), llm, settings.bargain);

        Self {
            portfolio_store,
            stream_store,
            payment_store,
            bargain_store,
            portfolio_service,
            bargain_service,
            checkout,
            checkout_settings: settings.checkout,
            webhook_settings: settings.webhook,
            model: settings.model,
        }
    }
}
