use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version plus which optional backends are wired.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let cache = state.cache.stats().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "companion",
        "remote_sync": state.sync.is_remote_configured(),
        "audio_cache": cache
    }))
}
