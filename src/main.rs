// src/main.rs
// folio - portfolio generation, negotiation and publishing backend

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use folio::api::http_router;
use folio::config::CONFIG;
use folio::llm::LlmClient;
use folio::payments::CheckoutClient;
use folio::state::{AppState, StateSettings};
use folio::store::{MemoryStore, SqliteStore};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Portfolio generation, negotiation and publishing backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind (overrides FOLIO_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides FOLIO_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep everything in memory instead of DATABASE_URL
        #[arg(long)]
        memory: bool,
    },

    /// Apply database migrations and exit
    Migrate,
}

fn state_settings() -> StateSettings {
    StateSettings {
        flush_interval: CONFIG.stream_flush_interval(),
        bargain: CONFIG.bargain_settings(),
        checkout: CONFIG.checkout_settings(),
        webhook: CONFIG.webhook_settings(),
        model: CONFIG.llm_model.clone(),
    }
}

async fn run_server(host: Option<String>, port: Option<u16>, memory: bool) -> Result<()> {
    info!("Starting folio v{}", env!("CARGO_PKG_VERSION"));
    info!("Model: {} via {}", CONFIG.llm_model, CONFIG.llm_base_url);

    if CONFIG.llm_api_key.trim().is_empty() {
        warn!("LLM_API_KEY is not set; generation requests will fail");
    }
    if CONFIG.payment_webhook_secret.is_empty() {
        warn!("PAYMENT_WEBHOOK_SECRET is not set; payment webhooks will be rejected");
    }

    let llm = Arc::new(LlmClient::new(CONFIG.llm_settings())?);
    let checkout = Arc::new(CheckoutClient::new(CONFIG.checkout_settings())?);

    let app_state = if memory {
        warn!("Running with in-memory storage; nothing will persist");
        AppState::new(Arc::new(MemoryStore::new()), llm, checkout, state_settings())
    } else {
        let store = SqliteStore::connect(&CONFIG.database_url, CONFIG.sqlite_max_connections).await?;
        info!("Database ready: {}", CONFIG.database_url);
        AppState::new(Arc::new(store), llm, checkout, state_settings())
    };

    let app = http_router(Arc::new(app_state));

    let bind_address = match (host, port) {
        (None, None) => CONFIG.bind_address(),
        (host, port) => format!(
            "{}:{}",
            host.unwrap_or_else(|| CONFIG.host.clone()),
            port.unwrap_or(CONFIG.port)
        ),
    };
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn run_migrations() -> Result<()> {
    SqliteStore::connect(&CONFIG.database_url, 1).await?;
    info!("Database at {} is up to date", CONFIG.database_url);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(CONFIG.tracing_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        memory: false,
    }) {
        Commands::Serve { host, port, memory } => run_server(host, port, memory).await,
        Commands::Migrate => run_migrations().await,
    }
}
