//! Reading queries.
//!
//! - `GET /readings/current/`: newest reading with dew points, 204 when none
//! - `GET /readings/history/?start&end`: readings strictly inside the range
//! - `GET /readings/history/delta/?end&days`: the `days` before `end`,
//!   widened by one day past `end`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use climate_core::{Reading, ReadingView};
use serde::Deserialize;
use std::sync::Arc;

use crate::{app::AppState, error::ApiError};

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct DeltaQuery {
    pub end: DateTime<Utc>,
    pub days: u32,
}

pub async fn current(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match state.readings.latest()? {
        Some(reading) => Ok(Json(ReadingView::from(reading)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    Ok(Json(state.readings.history(q.start, q.end)?))
}

pub async fn history_delta(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeltaQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    Ok(Json(state.readings.history_delta(q.end, q.days)?))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{get, json, send, test_state};
    use chrono::{Duration, TimeZone, Utc};
    use climate_core::Reading;

    #[tokio::test]
    async fn delta_covers_days_before_end_plus_one() {
        let state = test_state(None).await;
        let end = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        for (i, offset) in [-8i64, -2, 0, 1, 3].into_iter().enumerate() {
            state
                .readings
                .append(&Reading {
                    timestamp: end + Duration::days(offset) + Duration::hours(6),
                    indoor_temp: i as f64,
                    outdoor_temp: 0.0,
                    indoor_humidity: 40.0,
                    outdoor_humidity: 40.0,
                })
                .unwrap();
        }

        let body = json(
            send(
                &state,
                get("/readings/history/delta/?end=2024-03-10T00:00:00Z&days=7"),
            )
            .await,
        )
        .await;
        let temps: Vec<f64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["indoorTemp"].as_f64().unwrap())
            .collect();
        // -2d and 0d fall inside (end-7d, end+1d); -8d, +1d and +3d do not.
        assert_eq!(temps, vec![2.0, 1.0]);
    }
}
