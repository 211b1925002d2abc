use std::sync::Arc;

use crate::render::Renderer;
use crate::store::TemplateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable template store. Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn TemplateStore>,
    /// Stateless renderer; cloned into `spawn_blocking` closures by `Arc`.
    pub renderer: Arc<Renderer>,
}
