pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::companion::handlers as mentor;
use crate::quota::handlers as energy;
use crate::state::AppState;
use crate::sync::handlers as sync;

/// Uploads (images, voice notes) are larger than axum's 2 MiB default.
const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Energy
        .route("/api/v1/energy", get(energy::handle_get_energy))
        .route("/api/v1/energy/reset", post(energy::handle_reset_energy))
        .route(
            "/api/v1/energy/:action",
            get(energy::handle_quote_action).post(energy::handle_consume_action),
        )
        // Profile and progression
        .route(
            "/api/v1/profile",
            get(sync::handle_get_profile).put(sync::handle_put_profile),
        )
        .route("/api/v1/profile/rank", get(sync::handle_get_rank))
        .route("/api/v1/profile/premium", post(sync::handle_upgrade_premium))
        .route(
            "/api/v1/profile/achievements/:id",
            post(sync::handle_unlock_achievement),
        )
        // Journal, check-ins, feedback
        .route(
            "/api/v1/journal",
            get(sync::handle_journal_history).post(sync::handle_save_journal),
        )
        .route("/api/v1/checkins", post(sync::handle_save_check_in))
        .route(
            "/api/v1/feedback",
            get(sync::handle_has_rated).post(sync::handle_save_feedback),
        )
        .route("/api/v1/sync/flush", post(sync::handle_flush_outbox))
        // Mentor
        .route("/api/v1/mentor/chat", post(mentor::handle_chat))
        .route(
            "/api/v1/mentor/vision",
            post(mentor::handle_vision).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route(
            "/api/v1/mentor/transcribe",
            post(mentor::handle_transcribe).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/api/v1/mentor/ikigai", post(mentor::handle_ikigai))
        .route("/api/v1/mentor/reflect", post(mentor::handle_reflect))
        .route("/api/v1/narration", post(mentor::handle_narration))
        .with_state(state)
}
