//! CruxTrail - Core Web Vitals batch analysis service.
//!
//! Queries the Chrome UX Report API for a batch of URLs, rates each one and
//! summarizes the batch.

mod analysis;
mod config;
mod crux;
mod db;
mod web;

use analysis::{Analyzer, AnalyzerSettings};
use config::ServerConfig;
use crux::{CruxClient, MetricsSource, MockSource};
use db::Store;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("cruxtrail=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting CruxTrail on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Pick the data source
    let source: Arc<dyn MetricsSource> = match cfg.api_key.as_deref() {
        Some(key) if !cfg.mock_mode() => {
            tracing::info!("Using CrUX API at {}", cfg.api_base_url);
            Arc::new(CruxClient::new(key, &cfg.api_base_url, cfg.fetch_timeout)?)
        }
        _ => {
            tracing::info!("Using mock data - no usable CrUX API key or mock mode forced");
            Arc::new(MockSource::new())
        }
    };

    let analyzer = Arc::new(Analyzer::new(
        source,
        store.clone(),
        AnalyzerSettings::from(&cfg),
    ));

    // Start web server
    let server = Server::new(cfg, store, analyzer);
    server.start().await?;

    Ok(())
}
