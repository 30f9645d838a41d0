// Well-known realtime event names: the dashboard subscribes by these.

/// A new reading was persisted by the ingestion job.
pub const READING_NEW: &str = "reading.new";
/// The fan changed state (manual toggle).
pub const FAN_STATE: &str = "fan.state";
/// The settings record was replaced; payload carries the next fire time.
pub const SETTINGS_UPDATED: &str = "settings.updated";
/// First frame on every connection.
pub const CONNECTED: &str = "connected";
