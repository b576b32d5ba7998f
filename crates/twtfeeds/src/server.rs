//! HTTP server and routing
//!
//! Builds the axum router over the shared application state and runs it
//! until Ctrl-C.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use twtfeeds_core::{
    ArtifactStore, AvatarResolver, Config, ConfigFileStore, FeedRegistry, FeedsError,
    RegistryStore,
};

use crate::templates::Templates;
use crate::validate::{FeedValidator, HttpFeedValidator};

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: ArtifactStore,
    pub registry: Arc<FeedRegistry>,
    pub avatars: AvatarResolver,
    pub validator: Arc<dyn FeedValidator>,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Assemble state from explicit collaborators
    pub fn new(
        root: &Path,
        registry_store: impl RegistryStore + 'static,
        validator: Arc<dyn FeedValidator>,
    ) -> Result<Self, FeedsError> {
        let store = ArtifactStore::new(root);
        let registry = Arc::new(FeedRegistry::open(registry_store)?);
        Ok(Self {
            avatars: AvatarResolver::new(store.clone(), registry.clone()),
            store,
            registry,
            validator,
            templates: Arc::new(Templates::new()?),
        })
    }

    /// State for the service described by a config file.
    ///
    /// `saved` is the config as read from `config_path`; registrations are
    /// written back alongside its settings. `config` is the effective one.
    pub fn from_config(
        config_path: &Path,
        saved: Config,
        config: &Config,
    ) -> Result<Self, FeedsError> {
        let validator = HttpFeedValidator::new(Duration::from_secs(config.fetch_timeout))?;
        Self::new(
            &config.root,
            ConfigFileStore::new(config_path, saved),
            Arc::new(validator),
        )
    }
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Method Not Allowed",
    )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
}

/// Build the axum application router
///
/// Separated from `run_server` to enable testing without TCP binding.
pub(crate) fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(crate::index::index).post(crate::index::register))
        .route("/feeds", get(crate::listing::feeds))
        .route("/we-are-feeds", get(crate::listing::we_are_feeds))
        .route("/media/{name}", get(crate::resources::media))
        .route("/avatar/{name}", get(crate::resources::avatar))
        .route("/{name}/twtxt.txt", get(crate::resources::feed_text))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C
pub async fn run_server(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let app = build_app(state);

    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "twtfeeds server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
