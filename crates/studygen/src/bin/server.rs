//! Conversion server binary
//!
//! Run with: cargo run -p studygen --bin studygen-server
//! Set STUDYGEN_CONFIG to a TOML file to override the defaults.

use studygen::{config::StudygenConfig, server::StudygenServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studygen=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = StudygenConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunk length: {}-{} chars",
        config.chunking.min_input_length,
        config.chunking.max_input_length
    );
    tracing::info!(
        "  - Stale task timeout: {}s",
        config.tasks.stale_timeout_secs
    );

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let client = reqwest::Client::new();
    match client.get(format!("{}/api/tags", config.llm.base_url)).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("Ollama is running");
        }
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!("  Start it with `ollama serve` and pull {}", config.llm.generate_model);
        }
    }

    // Create and start server
    let server = StudygenServer::new(config).await?;
    tracing::info!("Health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
