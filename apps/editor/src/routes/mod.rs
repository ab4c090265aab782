pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Editing sessions
        .route("/api/v1/documents", post(handlers::handle_create_document))
        .route(
            "/api/v1/documents/:id",
            get(handlers::handle_get_document).delete(handlers::handle_close_document),
        )
        .route(
            "/api/v1/documents/:id/edits",
            post(handlers::handle_apply_edits),
        )
        .route(
            "/api/v1/documents/:id/preview",
            get(handlers::handle_preview),
        )
        .with_state(state)
}
