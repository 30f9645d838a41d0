use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use climate_core::{FanState, FanStatus};
use climate_protocol::EventFrame;
use serde::Deserialize;
use std::sync::Arc;

use crate::{app::AppState, error::ApiError};

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 1_000;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /fan/: current fan status, 204 before the first transition.
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.fan.current_status()? {
        Some(s) => Ok(Json(s.status()).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /fan/toggle/: invert the state as a manual override.
pub async fn toggle(State(state): State<Arc<AppState>>) -> Result<Json<FanStatus>, ApiError> {
    let next = state.fan.toggle()?;
    let status = next.status();
    state.fanout.publish(EventFrame::fan(&status));
    Ok(Json(status))
}

/// GET /fan/history/?limit: transitions, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<FanState>>, ApiError> {
    let limit = q
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    Ok(Json(state.fan.history(limit)?))
}
