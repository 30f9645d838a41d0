use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use climate_core::ClimateError;
use climate_fan::FanError;
use climate_scheduler::SchedulerError;
use climate_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Handler error. Wraps the core taxonomy and maps it onto HTTP statuses.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ClimateError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ClimateError::Validation { .. } => StatusCode::BAD_REQUEST,
            ClimateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Integrity { count } => Self(ClimateError::Integrity { count }),
            other => Self(ClimateError::Database(other.to_string())),
        }
    }
}

impl From<FanError> for ApiError {
    fn from(e: FanError) -> Self {
        match e {
            FanError::Store(store) => store.into(),
            other => Self(ClimateError::Internal(other.to_string())),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::InvalidSchedule { reason, .. } => {
                Self(ClimateError::validation("poll_interval_expression", reason))
            }
            other => Self(ClimateError::Internal(other.to_string())),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = Json(json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        }));
        (status, body).into_response()
    }
}
