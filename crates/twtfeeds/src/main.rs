mod cli;
mod error;
mod index;
mod listing;
mod resources;
mod server;
mod templates;
mod validate;

#[cfg(test)]
mod integration_tests;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use twtfeeds_core::Config;

use crate::server::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing with RUST_LOG support
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = cli::Cli::parse();

    info!(
        config = %cli.config.display(),
        bind = %cli.bind,
        root = ?cli.root,
        "twtfeeds starting"
    );

    let saved = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = saved.clone();
    if let Some(root) = cli.root {
        config.root = root;
    }
    info!(root = %config.root.display(), feeds = config.feeds.len(), "configuration loaded");

    let state = match AppState::from_config(&cli.config, saved, &config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run_server(&cli.bind, state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("twtfeeds shut down");
}
