use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The cron expression could not be parsed.
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    /// The driver task has not been started or has already shut down.
    #[error("Scheduler is not running")]
    NotRunning,

    /// An in-flight run did not finish within the shutdown grace period.
    #[error("In-flight run did not finish within {timeout_secs}s")]
    ShutdownTimeout { timeout_secs: u64 },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
