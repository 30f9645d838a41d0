//! `climate-core`: shared configuration, error taxonomy and domain types.

pub mod config;
pub mod dewpoint;
pub mod error;
pub mod settings;
pub mod types;

pub use error::{ClimateError, Result};
pub use settings::SettingsHandle;
pub use types::{ConnId, FanState, FanStatus, Measurement, Reading, ReadingView, Settings, Station};
