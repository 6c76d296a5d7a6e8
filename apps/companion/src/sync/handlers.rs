use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{SaveOutcome, SyncLayer};
use crate::errors::AppError;
use crate::gamification::{self, RankStatus};
use crate::models::{CheckIn, Feedback, JournalEntry, Profile, StoredJournalEntry};
use crate::state::AppState;

#[derive(Serialize)]
pub struct AchievementResponse {
    pub unlocked: bool,
    pub profile: Profile,
}

#[derive(Serialize)]
pub struct FlushResponse {
    pub delivered: usize,
    pub pending: usize,
}

#[derive(Serialize)]
pub struct RatedResponse {
    pub has_rated: bool,
}

/// Loads the profile a handler is about to modify. Fails rather than
/// overwrite a stored profile that cannot be read.
pub async fn load_for_update(sync: &SyncLayer) -> Result<Profile, AppError> {
    sync.profile_for_update()
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Stored profile unreadable")))
}

/// Writes the local cache now and pushes the remote merge in the background,
/// so the response never waits on the network.
pub async fn persist_profile(sync: &SyncLayer, profile: Profile) {
    sync.save_profile_local(&profile).await;
    let sync = sync.clone();
    tokio::spawn(async move {
        sync.push_profile(&profile).await;
    });
}

/// GET /api/v1/profile
pub async fn handle_get_profile(State(state): State<AppState>) -> Json<Profile> {
    Json(state.sync.get_profile().await.unwrap_or_default())
}

/// PUT /api/v1/profile
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Json(profile): Json<Profile>,
) -> Json<Profile> {
    persist_profile(&state.sync, profile.clone()).await;
    Json(profile)
}

/// GET /api/v1/profile/rank
pub async fn handle_get_rank(State(state): State<AppState>) -> Json<RankStatus> {
    let profile = state.sync.cached_profile().await;
    Json(gamification::rank_status(profile.xp))
}

/// POST /api/v1/profile/premium
pub async fn handle_upgrade_premium(State(state): State<AppState>) -> Result<Json<Profile>, AppError> {
    let mut profile = load_for_update(&state.sync).await?;
    gamification::upgrade_to_premium(&mut profile);
    // Waits for the remote copy so a purchase is never local-only.
    state.sync.save_profile(&profile).await;
    Ok(Json(profile))
}

/// POST /api/v1/profile/achievements/:id
pub async fn handle_unlock_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AchievementResponse>, AppError> {
    let achievement = gamification::achievement(&id)
        .ok_or_else(|| AppError::NotFound(format!("Achievement '{id}'")))?;

    let mut profile = load_for_update(&state.sync).await?;
    let unlocked = gamification::unlock(&mut profile, achievement);
    if unlocked {
        persist_profile(&state.sync, profile.clone()).await;
    }
    Ok(Json(AchievementResponse { unlocked, profile }))
}

/// GET /api/v1/journal
pub async fn handle_journal_history(
    State(state): State<AppState>,
) -> Json<Vec<StoredJournalEntry>> {
    Json(state.sync.get_journal_history().await)
}

/// POST /api/v1/journal
pub async fn handle_save_journal(
    State(state): State<AppState>,
    Json(entry): Json<JournalEntry>,
) -> Result<Json<SaveOutcome>, AppError> {
    entry.validate().map_err(AppError::Validation)?;
    Ok(Json(state.sync.save_journal_entry(&entry).await))
}

/// POST /api/v1/checkins
pub async fn handle_save_check_in(
    State(state): State<AppState>,
    Json(check_in): Json<CheckIn>,
) -> Result<Json<SaveOutcome>, AppError> {
    check_in.validate().map_err(AppError::Validation)?;
    Ok(Json(state.sync.save_check_in(&check_in).await))
}

/// POST /api/v1/feedback
pub async fn handle_save_feedback(
    State(state): State<AppState>,
    Json(feedback): Json<Feedback>,
) -> Result<Json<SaveOutcome>, AppError> {
    feedback.validate().map_err(AppError::Validation)?;
    Ok(Json(state.sync.save_feedback(&feedback).await))
}

/// GET /api/v1/feedback
pub async fn handle_has_rated(State(state): State<AppState>) -> Json<RatedResponse> {
    Json(RatedResponse {
        has_rated: state.sync.has_rated().await,
    })
}

/// POST /api/v1/sync/flush
pub async fn handle_flush_outbox(State(state): State<AppState>) -> Json<FlushResponse> {
    let delivered = state.sync.flush_outbox().await;
    Json(FlushResponse {
        delivered,
        pending: state.sync.pending_writes().await,
    })
}
