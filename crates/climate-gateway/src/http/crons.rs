//! Scheduled job ledger: GET /crons/
//!
//! One record per job with its current expression, last outcome and
//! run/failure/skip counters.

use axum::{extract::State, Json};
use climate_core::ClimateError;
use climate_scheduler::JobRecord;
use std::sync::Arc;

use crate::{app::AppState, error::ApiError};

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<JobRecord>>, ApiError> {
    let jobs = state
        .ledger
        .list()
        .map_err(|e| ClimateError::Database(e.to_string()))?;
    Ok(Json(jobs))
}
