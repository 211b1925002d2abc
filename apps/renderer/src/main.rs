mod config;
mod db;
mod errors;
mod layout;
mod models;
mod render;
mod routes;
mod state;
mod store;
mod templates;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::render::helpers::HelperTable;
use crate::render::Renderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryTemplateStore, PgTemplateStore, TemplateStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume renderer v{}", env!("CARGO_PKG_VERSION"));

    // Initialize template store
    let store: Arc<dyn TemplateStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            Arc::new(PgTemplateStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; templates are kept in memory only");
            Arc::new(MemoryTemplateStore::new())
        }
    };

    // Initialize renderer with the standard helper set
    let helpers = HelperTable::standard();
    let layout = config.layout_options();
    info!(
        "Renderer ready: {} helpers, canvas {}x{} margin {}",
        helpers.iter().count(),
        layout.canvas_width,
        layout.canvas_height,
        layout.margin
    );
    let renderer = Arc::new(Renderer::new(&helpers, layout));

    // Build app state
    let state = AppState { store, renderer };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
