use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod ingest;
mod models;
mod parser;
mod report;
mod store;
mod table;
#[cfg(test)]
mod test_support;

use config::Config;
use store::RollupStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Resolve settings and data root
    let config = Config::from_env();
    let layout = config.layout();
    info!(root = %config.root.display(), escaping = ?config.escaping, "starting dkpboard");

    // 2. Make sure the rollups folder exists before anything is ingested
    let store = RollupStore::new(&layout);
    if store.ensure_dir()? {
        info!(path = %store.dir().display(), "created rollups directory");
    }

    // 3. Bind and serve
    let app = api::create_router(&config);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    let url = format!("http://localhost:{}", config.port);
    info!(%url, "server listening");

    if config.open_browser {
        if let Err(e) = open::that(&url) {
            warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    Ok(())
}
