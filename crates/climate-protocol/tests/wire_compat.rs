// Verify the realtime wire format the dashboard parses.
// Field names here are a contract with the frontend; do not rename casually.

use chrono::Utc;
use climate_core::{ConnId, FanStatus, Measurement, Reading, Settings};
use climate_protocol::events;
use climate_protocol::frames::EventFrame;

#[test]
fn event_frame_with_seq() {
    let ev = EventFrame::new("tick", serde_json::json!({"ts": 1234567890})).with_seq(42);
    let json = ev.to_text();

    assert!(json.contains(r#""type":"event""#));
    assert!(json.contains(r#""event":"tick""#));
    assert!(json.contains(r#""seq":42"#));
}

#[test]
fn seq_absent_until_assigned() {
    let ev = EventFrame::new(events::CONNECTED, serde_json::json!({}));
    assert!(!ev.to_text().contains(r#""seq""#));
}

#[test]
fn reading_event_carries_camel_case_fields() {
    let reading = Reading::from_measurements(
        Utc::now(),
        Measurement::new(22.0, 55.0),
        Measurement::new(10.0, 80.0),
    );
    let json = EventFrame::reading(&reading).to_text();

    assert!(json.contains(r#""event":"reading.new""#));
    assert!(json.contains(r#""indoorTemp":22.0"#));
    assert!(json.contains(r#""indoorHumidity":55.0"#));
    assert!(json.contains(r#""outdoorTemp":10.0"#));
}

#[test]
fn fan_event_matches_status_endpoint_shape() {
    let status = FanStatus {
        running: true,
        updated_at: Utc::now(),
    };
    let frame = EventFrame::fan(&status);
    let payload = frame.payload.unwrap();

    assert_eq!(frame.event, events::FAN_STATE);
    assert_eq!(payload["running"], true);
    assert!(payload.get("updatedAt").is_some());
}

#[test]
fn settings_event_includes_next_fire() {
    let frame = EventFrame::settings(&Settings::default(), None);
    let payload = frame.payload.unwrap();

    assert_eq!(payload["settings"]["poll_interval_expression"], "*/30 * * * *");
    assert!(payload["nextFire"].is_null());
}

#[test]
fn connected_event_echoes_conn_id() {
    let id = ConnId("abc".to_string());
    let frame = EventFrame::connected(&id);
    assert_eq!(frame.payload.unwrap()["connId"], "abc");
}
