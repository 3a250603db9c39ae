use std::sync::Arc;

use anyhow::Context;
use easyflight::api::{AppState, create_router};
use easyflight::config::CONFIG;
use easyflight::currency::CurrencyConverter;
use easyflight::db::{Database, SearchLogRepo};
use easyflight::pipeline::SearchPipeline;
use easyflight::provider::AmadeusGateway;
use easyflight::search_log::SearchLogWriter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let db = Database::from_config().await?;
    let search_logs = SearchLogWriter::with_limits(
        Arc::new(SearchLogRepo::new(&db)),
        CONFIG.search_log_queue_capacity,
        CONFIG.search_log_save_timeout,
    );

    let gateway = AmadeusGateway::new(
        &CONFIG.provider_base_url,
        &CONFIG.provider_client_id,
        &CONFIG.provider_client_secret,
        CONFIG.provider_timeout,
    )
    .context("Failed to build provider client")?;
    let converter = CurrencyConverter::new(&CONFIG.currency_api_url, CONFIG.currency_timeout)
        .context("Failed to build currency client")?;

    let state = AppState {
        pipeline: Arc::new(SearchPipeline::new(Arc::new(gateway), Arc::new(converter))),
        search_logs,
    };
    let app = create_router(state, CONFIG.front_end_origin.as_deref());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", CONFIG.port))
        .await
        .with_context(|| format!("Failed to bind port {}", CONFIG.port))?;
    tracing::info!("App is listening on port {}", CONFIG.port);
    axum::serve(listener, app).await?;
    Ok(())
}
