//! Runtime settings: all routes sit behind [`crate::auth::settings_auth`].
//!
//! Updates run in a fixed order: validate, persist, replace the live value,
//! reconfigure the scheduler, notify observers. A rejected update leaves
//! every layer untouched.

use axum::{
    extract::{Query, State},
    Json,
};
use climate_core::{ClimateError, Settings, Station};
use climate_protocol::EventFrame;
use climate_scheduler::cron;
use climate_sensors::station::parse_address;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::{app::AppState, error::ApiError};

#[derive(Deserialize)]
pub struct AddressQuery {
    pub address: String,
}

/// GET /settings/
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.settings.current().as_ref().clone()))
}

/// POST /settings/: replace the whole record.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(next): Json<Settings>,
) -> Result<Json<&'static str>, ApiError> {
    validate(&next)?;

    let _guard = state.settings_lock.lock().await;
    state.settings_store.save(&next)?;
    state.settings.replace(next.clone());
    let next_fire = state
        .scheduler
        .reconfigure(&next.poll_interval_expression)
        .await?;

    info!(
        poll = %next.poll_interval_expression,
        next_fire = ?next_fire,
        "settings updated"
    );
    state.fanout.publish(EventFrame::settings(&next, next_fire));
    Ok(Json("ok"))
}

/// POST /settings/indoor-address/?address=
pub async fn set_indoor_address(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<&'static str>, ApiError> {
    set_address(&state, Station::Indoor, q.address).await
}

/// POST /settings/outdoor-address/?address=
pub async fn set_outdoor_address(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<&'static str>, ApiError> {
    set_address(&state, Station::Outdoor, q.address).await
}

async fn set_address(
    state: &AppState,
    station: Station,
    address: String,
) -> Result<Json<&'static str>, ApiError> {
    parse_address(&address)?;

    let _guard = state.settings_lock.lock().await;
    let mut next = state.settings.current().as_ref().clone();
    match station {
        Station::Indoor => next.indoor_sensor_address = address,
        Station::Outdoor => next.outdoor_sensor_address = address,
    }
    state.settings_store.save(&next)?;
    state.settings.replace(next.clone());

    info!(%station, address = %next.address_for(station), "sensor address updated");
    state
        .fanout
        .publish(EventFrame::settings(&next, state.scheduler.next_fire()));
    Ok(Json("ok"))
}

fn validate(settings: &Settings) -> Result<(), ApiError> {
    parse_address(&settings.indoor_sensor_address).map_err(|e| rename(e, "indoor_sensor_address"))?;
    parse_address(&settings.outdoor_sensor_address)
        .map_err(|e| rename(e, "outdoor_sensor_address"))?;
    cron::validate(&settings.poll_interval_expression)?;
    if settings.fan_override_duration_seconds == 0 {
        return Err(
            ClimateError::validation("fan_override_duration_seconds", "must be positive").into(),
        );
    }
    Ok(())
}

fn rename(err: ClimateError, field: &str) -> ClimateError {
    match err {
        ClimateError::Validation { reason, .. } => ClimateError::validation(field, reason),
        other => other,
    }
}
