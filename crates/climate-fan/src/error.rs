use climate_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FanError {
    /// Reading or appending fan history failed.
    #[error("Fan state store error: {0}")]
    Store(#[from] StoreError),

    /// The hardware sync could not be applied. Logged only; the recorded
    /// state is kept.
    #[error("Fan actuator '{actuator}' failed: {reason}")]
    Actuator { actuator: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FanError>;
