use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected before persistence; the previous state is unchanged.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Zero or several settings records. Fatal at startup.
    #[error("Configuration integrity error: expected exactly one settings record, found {count}")]
    Integrity { count: usize },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClimateError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ClimateError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short error code string sent to clients in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ClimateError::Config(_) => "CONFIG_ERROR",
            ClimateError::Validation { .. } => "VALIDATION_ERROR",
            ClimateError::Integrity { .. } => "INTEGRITY_ERROR",
            ClimateError::Unauthorized(_) => "UNAUTHORIZED",
            ClimateError::Database(_) => "DATABASE_ERROR",
            ClimateError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClimateError>;
