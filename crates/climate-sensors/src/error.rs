use climate_core::Station;
use thiserror::Error;

/// Errors that can occur while reading a sensor.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A single read failed; worth retrying.
    #[error("Sensor read failed ({station}): {reason}")]
    Transient { station: Station, reason: String },

    /// The retry budget is exhausted. Aborts the current ingestion run only.
    #[error("Communication with the {station} sensor failed after {attempts} attempts")]
    Communication { station: Station, attempts: u32 },

    /// The measuring station could not be reached.
    #[error("Station request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The station answered with something that is not a measurement.
    #[error("Malformed station response: {0}")]
    Malformed(String),
}
