use chrono::{DateTime, Utc};
use climate_core::{ConnId, FanStatus, Reading, Settings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events;

/// Server → Client unsolicited push event.
/// Wire: `{ "type": "event", "event": "reading.new", "payload": {...}, "seq": 42 }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            frame_type: "event".to_string(),
            event: event.into(),
            payload: Some(serde_json::to_value(payload).unwrap_or(Value::Null)),
            seq: None,
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn reading(reading: &Reading) -> Self {
        Self::new(events::READING_NEW, reading)
    }

    pub fn fan(status: &FanStatus) -> Self {
        Self::new(events::FAN_STATE, status)
    }

    pub fn settings(settings: &Settings, next_fire: Option<DateTime<Utc>>) -> Self {
        Self::new(
            events::SETTINGS_UPDATED,
            serde_json::json!({ "settings": settings, "nextFire": next_fire }),
        )
    }

    pub fn connected(conn_id: &ConnId) -> Self {
        Self::new(events::CONNECTED, serde_json::json!({ "connId": conn_id }))
    }

    /// Serialize to the text payload sent over the socket.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
