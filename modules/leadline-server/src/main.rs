use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Anthropic;
use leadline_common::Config;
use scrape_client::ScrapeClient;

use leadline_server::notify::{CaptureNotifier, HttpNotifier};
use leadline_server::store::Store;
use leadline_server::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadline=info".parse()?))
        .init();

    let config = Config::from_env();

    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;

    let ai = Anthropic::new(&config.anthropic_api_key, &config.anthropic_model);
    let scraper = ScrapeClient::new(&config.scrape_api_url, config.scrape_api_token.as_deref());
    let notifier: Arc<dyn CaptureNotifier> = Arc::new(HttpNotifier::new(
        config.webhook_url.clone(),
        &config.public_base_url,
        &config.internal_secret,
    ));

    let host = config.host.clone();
    let port = config.port;

    let state = Arc::new(AppState {
        store,
        ai,
        scraper,
        notifier,
        http: reqwest::Client::new(),
        config,
    });

    let addr = format!("{host}:{port}");
    info!("Leadline server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
