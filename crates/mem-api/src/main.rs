//! Memory REST API server: /v1/memories.

use mem_api::config::ServerConfig;
use mem_api::server::{self, AppState};
use mem_client::{init_with_fallback, MemoryConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server_config = ServerConfig::from_env()?;
    let primary = MemoryConfig::from_env()?;
    let memory = init_with_fallback(&primary, &MemoryConfig::fallback()).await?;

    let app = server::router(Arc::new(AppState::new(memory)));
    let addr = server_config.socket_addr();
    tracing::info!("Memory API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
