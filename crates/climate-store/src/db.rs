use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// Initialise every climate table. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_readings_table(conn)?;
    create_fan_states_table(conn)?;
    create_settings_table(conn)?;
    Ok(())
}

pub(crate) fn create_readings_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS readings (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp         TEXT NOT NULL,
            indoor_temp       REAL NOT NULL,
            outdoor_temp      REAL NOT NULL,
            indoor_humidity   REAL NOT NULL,
            outdoor_humidity  REAL NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_readings_timestamp
            ON readings(timestamp DESC);",
    )?;
    Ok(())
}

pub(crate) fn create_fan_states_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS fan_states (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp    TEXT NOT NULL,
            running      INTEGER NOT NULL,
            override_at  TEXT              -- NULL for automatic transitions
        );
        CREATE INDEX IF NOT EXISTS idx_fan_states_timestamp
            ON fan_states(timestamp DESC);",
    )?;
    Ok(())
}

/// Rows are counted on load; more than one is an integrity error.
pub(crate) fn create_settings_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            indoor_sensor_address    TEXT NOT NULL,
            outdoor_sensor_address   TEXT NOT NULL,
            poll_interval_expression TEXT NOT NULL,
            fan_override_duration    INTEGER NOT NULL,
            updated_at               TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// Fixed-width RFC3339 (microseconds, `Z`) so TEXT comparison orders correctly.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Like [`format_ts`], but rounds sub-microsecond precision up. Used for
/// exclusive upper bounds so a stored value below `ts` still compares below.
pub fn format_ts_ceil(ts: &DateTime<Utc>) -> String {
    let floor = ts.trunc_subsecs(6);
    if floor < *ts {
        format_ts(&(floor + Duration::microseconds(1)))
    } else {
        format_ts(&floor)
    }
}

/// Map a parse failure inside a row mapper to a rusqlite error.
pub(crate) fn column_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
