use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and session usage.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-editor",
        "open_sessions": state.sessions.open_count().await,
        "max_sessions": state.config.max_sessions,
        "session_ttl_secs": state.config.session_ttl_secs
    }))
}
