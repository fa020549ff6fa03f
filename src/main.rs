use std::sync::Arc;

use anyhow::Context;
use fenav::app::{build_router, AppState};
use fenav::config::Settings;
use fenav::notion::client::{HttpNotionClient, NotionClient};
use fenav::storage::client::{S3StorageClient, StorageClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fenav=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting fenav server...");

    let settings = Settings::load().context("Failed to load configuration")?;

    // Notion and storage are optional: the endpoints needing them answer
    // with a configuration error until they are set up.
    let notion: Option<Arc<dyn NotionClient>> = match HttpNotionClient::from_settings(&settings.notion) {
        Ok(client) => {
            tracing::info!(api_base = %settings.notion.api_base, "Notion client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("Notion disabled: {e}");
            None
        }
    };

    let storage_client: Option<Arc<dyn StorageClient>> =
        match S3StorageClient::from_settings(&settings.storage).await {
            Ok(client) => {
                tracing::info!("S3 storage client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!("Uploads disabled: {e}");
                None
            }
        };

    if settings.auth.service_token.is_none() {
        tracing::warn!("auth.service_token is not set; login is disabled");
    }

    let addr = settings.server.addr.clone();
    let app = build_router(AppState::new(settings, notion, storage_client));

    // Start the server
    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
