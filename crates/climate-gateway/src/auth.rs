use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use climate_core::{config::ClimateConfig, ClimateError};
use std::sync::Arc;

use crate::{app::AppState, error::ApiError};

/// Route layer for the settings routes. Runs before any body extractor, so
/// an unauthenticated request is rejected with 401 whatever it carries.
pub async fn settings_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_token(&state.config, req.headers())?;
    Ok(next.run(req).await)
}

/// Reject the request unless it carries the configured bearer token.
///
/// With no token configured every request passes.
pub fn require_token(config: &ClimateConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = config.gateway.auth.token.as_deref() else {
        return Ok(());
    };
    match extract_bearer(headers) {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(ClimateError::Unauthorized("invalid token".into()).into()),
        None => Err(ClimateError::Unauthorized(
            "set 'Authorization: Bearer <token>' header".into(),
        )
        .into()),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
