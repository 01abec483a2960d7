// MoMo SMS Ledger - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use momo_ledger::api::{router, AppState};
use momo_ledger::{load_store, AppConfig, Extractor};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::load(AppConfig::env_path().as_deref())?;
    let extractor = Extractor::new(&config.extractor)?;

    // Fails hard on a corrupt or missing source rather than serving an empty store
    let store = load_store(&config.data, &extractor)?;
    info!("Loaded {} transactions", store.len());

    let app = router(AppState::new(store, config.auth.clone()));

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("API: http://{}/transactions (HTTP Basic auth)", addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
