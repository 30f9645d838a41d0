//! `climate-store`: append-only SQLite persistence for readings and fan
//! history, plus the single settings record.
//!
//! Each store owns its own `Connection` behind a `Mutex`; all of them may
//! point at the same database file.

pub mod db;
pub mod error;
pub mod fan;
pub mod readings;
pub mod settings;

pub use error::{Result, StoreError};
pub use fan::FanStateStore;
pub use readings::ReadingStore;
pub use settings::SettingsStore;
