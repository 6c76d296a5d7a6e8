use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{Action, EnergyReport};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ActionQuote {
    pub action: Action,
    pub cost: u32,
    pub can_afford: bool,
    pub remaining: u32,
}

#[derive(Serialize)]
pub struct ConsumeResponse {
    pub action: Action,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub energy: EnergyReport,
}

fn parse_action(raw: &str) -> Result<Action, AppError> {
    raw.parse::<Action>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// GET /api/v1/energy
pub async fn handle_get_energy(State(state): State<AppState>) -> Json<EnergyReport> {
    Json(state.ledger.report().await)
}

/// POST /api/v1/energy/reset
pub async fn handle_reset_energy(State(state): State<AppState>) -> Json<EnergyReport> {
    state.ledger.reset_energy().await;
    Json(state.ledger.report().await)
}

/// GET /api/v1/energy/:action
pub async fn handle_quote_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Json<ActionQuote>, AppError> {
    let action = parse_action(&action)?;
    let can_afford = state.ledger.can_afford(action).await;
    Ok(Json(ActionQuote {
        action,
        cost: action.cost(),
        can_afford,
        remaining: state.ledger.get_energy().await,
    }))
}

/// POST /api/v1/energy/:action
/// Charges an action the client runs itself (e.g. a live voice session).
pub async fn handle_consume_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Json<ConsumeResponse>, AppError> {
    let action = parse_action(&action)?;
    let allowed = state.ledger.consume(action).await;
    Ok(Json(ConsumeResponse {
        action,
        allowed,
        message: (!allowed).then(|| state.ledger.depleted_message()),
        energy: state.ledger.report().await,
    }))
}
