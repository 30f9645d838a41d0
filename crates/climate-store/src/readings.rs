use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use climate_core::Reading;
use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::db::{column_ts, create_readings_table, format_ts, format_ts_ceil};
use crate::error::{Result, StoreError};

/// Append-only store of ingestion readings.
pub struct ReadingStore {
    db: Mutex<Connection>,
}

impl ReadingStore {
    /// Wrap a connection, creating the `readings` table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        create_readings_table(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    #[instrument(skip(self, reading), fields(ts = %reading.timestamp))]
    pub fn append(&self, reading: &Reading) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO readings
             (timestamp, indoor_temp, outdoor_temp, indoor_humidity, outdoor_humidity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                format_ts(&reading.timestamp),
                reading.indoor_temp,
                reading.outdoor_temp,
                reading.indoor_humidity,
                reading.outdoor_humidity,
            ],
        )?;
        debug!("reading persisted");
        Ok(())
    }

    /// Most recent reading, `None` before the first successful poll.
    pub fn latest(&self) -> Result<Option<Reading>> {
        let db = self.conn()?;
        match db.query_row(
            "SELECT timestamp, indoor_temp, outdoor_temp, indoor_humidity, outdoor_humidity
             FROM readings ORDER BY timestamp DESC, id DESC LIMIT 1",
            [],
            row_to_reading,
        ) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Readings with `start < timestamp < end` (both exclusive), newest first.
    #[instrument(skip(self))]
    pub fn history(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Reading>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT timestamp, indoor_temp, outdoor_temp, indoor_humidity, outdoor_humidity
             FROM readings
             WHERE timestamp > ?1 AND timestamp < ?2
             ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![format_ts(&start), format_ts_ceil(&end)],
            row_to_reading,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// History for the `days` days up to and including the day of `end`.
    pub fn history_delta(&self, end: DateTime<Utc>, days: u32) -> Result<Vec<Reading>> {
        let (start, end) = delta_range(end, days);
        self.history(start, end)
    }

    pub fn count(&self) -> Result<usize> {
        let db = self.conn()?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// Translate `end` + day count to the `[end - days, end + 1 day)` window.
pub fn delta_range(end: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        end - Duration::days(i64::from(days)),
        end + Duration::days(1),
    )
}

fn row_to_reading(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reading> {
    Ok(Reading {
        timestamp: column_ts(row, 0)?,
        indoor_temp: row.get(1)?,
        outdoor_temp: row.get(2)?,
        indoor_humidity: row.get(3)?,
        outdoor_humidity: row.get(4)?,
    })
}
