use std::sync::{Mutex, MutexGuard};

use climate_core::FanState;
use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::db::{column_ts, create_fan_states_table, format_ts};
use crate::error::{Result, StoreError};

/// Append-only history of fan transitions.
pub struct FanStateStore {
    db: Mutex<Connection>,
}

impl FanStateStore {
    pub fn new(conn: Connection) -> Result<Self> {
        create_fan_states_table(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    #[instrument(skip(self, state), fields(running = state.running, ts = %state.timestamp))]
    pub fn append(&self, state: &FanState) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO fan_states (timestamp, running, override_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                format_ts(&state.timestamp),
                state.running,
                state.override_at.as_ref().map(format_ts),
            ],
        )?;
        debug!("fan state appended");
        Ok(())
    }

    /// The current fan state: the entry with the maximum timestamp.
    pub fn latest(&self) -> Result<Option<FanState>> {
        let db = self.conn()?;
        match db.query_row(
            "SELECT timestamp, running, override_at FROM fan_states
             ORDER BY timestamp DESC, id DESC LIMIT 1",
            [],
            row_to_state,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Most recent `limit` transitions, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<FanState>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT timestamp, running, override_at FROM fan_states
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], row_to_state)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count(&self) -> Result<usize> {
        let db = self.conn()?;
        let n: i64 = db.query_row("SELECT COUNT(*) FROM fan_states", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn row_to_state(row: &rusqlite::Row<'_>) -> rusqlite::Result<FanState> {
    let override_at = match row.get::<_, Option<String>>(2)? {
        Some(_) => Some(column_ts(row, 2)?),
        None => None,
    };
    Ok(FanState {
        timestamp: column_ts(row, 0)?,
        running: row.get(1)?,
        override_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn store() -> FanStateStore {
        FanStateStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn empty_history_has_no_latest() {
        let s = store();
        assert!(s.latest().unwrap().is_none());
        assert_eq!(s.count().unwrap(), 0);
    }

    #[test]
    fn override_marker_round_trips() {
        let s = store();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let manual = FanState {
            timestamp: ts,
            running: true,
            override_at: Some(ts),
        };
        s.append(&manual).unwrap();
        assert_eq!(s.latest().unwrap().unwrap(), manual);

        let automatic = FanState {
            timestamp: ts + Duration::minutes(5),
            running: false,
            override_at: None,
        };
        s.append(&automatic).unwrap();
        assert_eq!(s.latest().unwrap().unwrap(), automatic);
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let s = store();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        for i in 0..5 {
            s.append(&FanState {
                timestamp: t0 + Duration::seconds(i),
                running: i % 2 == 0,
                override_at: None,
            })
            .unwrap();
        }
        let got = s.history(3).unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].timestamp, t0 + Duration::seconds(4));
        assert_eq!(got[2].timestamp, t0 + Duration::seconds(2));
    }
}
