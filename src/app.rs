use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth;
use crate::catalog::cache::Catalog;
use crate::config::Settings;
use crate::error::AppError;
use crate::notion::client::NotionClient;
use crate::storage::client::StorageClient;

/// Shared state handed to every handler.
///
/// Collaborators are optional: when one is not configured the requests
/// needing it fail with a configuration error instead of the whole server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub notion: Option<Arc<dyn NotionClient>>,
    pub catalog: Option<Arc<Catalog>>,
    pub storage_client: Option<Arc<dyn StorageClient>>,
    /// Client for fetching third-party pages (metadata extraction).
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        settings: Settings,
        notion: Option<Arc<dyn NotionClient>>,
        storage_client: Option<Arc<dyn StorageClient>>,
    ) -> Self {
        let catalog = notion.clone().map(|client| {
            Arc::new(Catalog::new(
                client,
                settings.notion.clone(),
                Duration::from_secs(settings.cache.revalidate_secs),
            ))
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("fenav/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            settings: Arc::new(settings),
            notion,
            catalog,
            storage_client,
            http,
        }
    }

    pub fn notion(&self) -> Result<&dyn NotionClient, AppError> {
        self.notion
            .as_deref()
            .ok_or_else(|| AppError::Config("notion.token is not configured".into()))
    }

    pub fn catalog(&self) -> Result<&Catalog, AppError> {
        self.catalog
            .as_deref()
            .ok_or_else(|| AppError::Config("notion.token is not configured".into()))
    }

    pub fn storage(&self) -> Result<&dyn StorageClient, AppError> {
        self.storage_client
            .as_deref()
            .ok_or_else(|| AppError::Config("storage is not configured".into()))
    }
}

/// Require a valid session on `route`.
fn gated(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::middleware::require_session,
    ))
}

/// Build the HTTP router. Routes wrapped in `gated` require a session.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/data",
            get(api::data::list_handler).merge(gated(&state, post(api::data::submit_handler))),
        )
        .route("/api/v1/category", get(api::category::category_handler))
        .route("/api/v1/search", post(api::search::search_handler))
        .route("/api/v1/meta", gated(&state, post(api::meta::meta_handler)))
        .route(
            "/api/v1/upload",
            gated(&state, post(api::upload::upload_handler))
                .layer(DefaultBodyLimit::max(api::upload::MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route("/api/v1/blog", get(api::blog::list_handler))
        .route("/api/v1/blog/{id}", get(api::blog::post_handler))
        .route("/api/auth/login", post(auth::handlers::login_handler))
        .route("/api/auth/logout", post(auth::handlers::logout_handler))
        .route("/api/auth/me", gated(&state, get(auth::handlers::me_handler)))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
