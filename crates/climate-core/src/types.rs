use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::{
    DEFAULT_INDOOR_ADDRESS, DEFAULT_OUTDOOR_ADDRESS, DEFAULT_OVERRIDE_SECS, DEFAULT_POLL_INTERVAL,
};
use crate::dewpoint::dew_point;

/// Which measuring station a sensor read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Station {
    Indoor,
    Outdoor,
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Station::Indoor => write!(f, "indoor"),
            Station::Outdoor => write!(f, "outdoor"),
        }
    }
}

/// One temperature/humidity sample from a single station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

impl Measurement {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }
}

/// A timestamped indoor/outdoor sample. Never updated once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub indoor_temp: f64,
    pub outdoor_temp: f64,
    pub indoor_humidity: f64,
    pub outdoor_humidity: f64,
}

impl Reading {
    pub fn from_measurements(
        timestamp: DateTime<Utc>,
        indoor: Measurement,
        outdoor: Measurement,
    ) -> Self {
        Self {
            timestamp,
            indoor_temp: indoor.temperature,
            outdoor_temp: outdoor.temperature,
            indoor_humidity: indoor.humidity,
            outdoor_humidity: outdoor.humidity,
        }
    }
}

/// A reading enriched with derived dew points, as served to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingView {
    #[serde(flatten)]
    pub reading: Reading,
    pub indoor_dew_point: f64,
    pub outdoor_dew_point: f64,
}

impl From<Reading> for ReadingView {
    fn from(reading: Reading) -> Self {
        let indoor_dew_point = dew_point(reading.indoor_temp, reading.indoor_humidity);
        let outdoor_dew_point = dew_point(reading.outdoor_temp, reading.outdoor_humidity);
        Self {
            reading,
            indoor_dew_point,
            outdoor_dew_point,
        }
    }
}

/// Snapshot of the fan appended on every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanState {
    pub timestamp: DateTime<Utc>,
    pub running: bool,
    /// When a manual override was asserted, if this state came from one.
    #[serde(rename = "override")]
    pub override_at: Option<DateTime<Utc>>,
}

impl FanState {
    /// End of the override window, or `None` for automatic states.
    pub fn override_expires_at(&self, duration_secs: u64) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(duration_secs).unwrap_or(i64::MAX);
        self.override_at.map(|at| {
            Duration::try_seconds(secs)
                .and_then(|d| at.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    pub fn override_active(&self, duration_secs: u64, now: DateTime<Utc>) -> bool {
        self.override_expires_at(duration_secs)
            .is_some_and(|expiry| now < expiry)
    }

    pub fn status(&self) -> FanStatus {
        FanStatus {
            running: self.running,
            updated_at: self.timestamp,
        }
    }
}

/// Wire projection of the latest [`FanState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanStatus {
    pub running: bool,
    pub updated_at: DateTime<Utc>,
}

/// The single runtime-editable settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub indoor_sensor_address: String,
    pub outdoor_sensor_address: String,
    /// Standard 5-field cron expression driving ingestion.
    pub poll_interval_expression: String,
    pub fan_override_duration_seconds: u64,
}

impl Settings {
    pub fn address_for(&self, station: Station) -> &str {
        match station {
            Station::Indoor => &self.indoor_sensor_address,
            Station::Outdoor => &self.outdoor_sensor_address,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indoor_sensor_address: DEFAULT_INDOOR_ADDRESS.to_string(),
            outdoor_sensor_address: DEFAULT_OUTDOOR_ADDRESS.to_string(),
            poll_interval_expression: DEFAULT_POLL_INTERVAL.to_string(),
            fan_override_duration_seconds: DEFAULT_OVERRIDE_SECS,
        }
    }
}

/// Per-connection identifier for realtime observers (random UUID, not persisted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_serializes_camel_case() {
        let reading = Reading::from_measurements(
            Utc::now(),
            Measurement::new(22.0, 55.0),
            Measurement::new(10.0, 80.0),
        );
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains(r#""indoorTemp":22.0"#));
        assert!(json.contains(r#""outdoorHumidity":80.0"#));
    }

    #[test]
    fn reading_view_flattens_and_adds_dew_points() {
        let reading = Reading::from_measurements(
            Utc::now(),
            Measurement::new(20.0, 50.0),
            Measurement::new(10.0, 80.0),
        );
        let json = serde_json::to_value(ReadingView::from(reading)).unwrap();
        assert!(json.get("indoorTemp").is_some());
        let dp = json["indoorDewPoint"].as_f64().unwrap();
        assert!((dp - 9.3).abs() < 0.1, "dew point was {dp}");
    }

    #[test]
    fn fan_state_override_window() {
        let at = Utc::now();
        let state = FanState {
            timestamp: at,
            running: true,
            override_at: Some(at),
        };
        assert!(state.override_active(60, at + Duration::seconds(59)));
        assert!(!state.override_active(60, at + Duration::seconds(60)));

        let automatic = FanState {
            override_at: None,
            ..state
        };
        assert!(!automatic.override_active(60, at));
    }

    #[test]
    fn fan_state_override_field_name_on_wire() {
        let state = FanState {
            timestamp: Utc::now(),
            running: false,
            override_at: None,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""override":null"#));
    }

    #[test]
    fn station_display_matches_wire_name() {
        assert_eq!(Station::Outdoor.to_string(), "outdoor");
        assert_eq!(serde_json::to_string(&Station::Indoor).unwrap(), r#""indoor""#);
    }
}
