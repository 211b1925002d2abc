pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::templates::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Template catalogue
        .route(
            "/api/v1/templates",
            get(handlers::handle_list_templates).post(handlers::handle_create_template),
        )
        .route(
            "/api/v1/templates/categories",
            get(handlers::handle_list_categories),
        )
        .route(
            "/api/v1/templates/:id",
            get(handlers::handle_get_template).delete(handlers::handle_delete_template),
        )
        .route(
            "/api/v1/templates/:id/render",
            post(handlers::handle_render_template),
        )
        .route("/api/v1/templates/:id/use", post(handlers::handle_use_template))
        .route("/api/v1/templates/:id/rate", post(handlers::handle_rate_template))
        // Stateless render
        .route("/api/v1/render", post(handlers::handle_render_inline))
        .with_state(state)
}
