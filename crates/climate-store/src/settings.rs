use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use climate_core::Settings;
use rusqlite::Connection;
use tracing::{info, instrument};

use crate::db::{create_settings_table, format_ts};
use crate::error::{Result, StoreError};

/// Persistence for the single settings record.
///
/// Every read checks that exactly one row exists; a second row can only
/// appear through outside tampering and makes the correct record
/// undecidable.
pub struct SettingsStore {
    db: Mutex<Connection>,
}

impl SettingsStore {
    pub fn new(conn: Connection) -> Result<Self> {
        create_settings_table(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Startup entry point: create the record with defaults when the table
    /// is empty, return it when exactly one exists, fail otherwise.
    #[instrument(skip(self, defaults))]
    pub fn load_or_init(&self, defaults: &Settings) -> Result<Settings> {
        let db = self.conn()?;
        match count_rows(&db)? {
            0 => {
                insert(&db, defaults)?;
                info!("no settings record found, created defaults");
                Ok(defaults.clone())
            }
            1 => select_one(&db),
            count => Err(StoreError::Integrity { count }),
        }
    }

    pub fn get(&self) -> Result<Settings> {
        let db = self.conn()?;
        match count_rows(&db)? {
            1 => select_one(&db),
            count => Err(StoreError::Integrity { count }),
        }
    }

    /// Overwrite the single record in place. Nothing is written unless
    /// exactly one record exists.
    #[instrument(skip(self, settings), fields(poll = %settings.poll_interval_expression))]
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        match count_rows(&tx)? {
            1 => {}
            count => return Err(StoreError::Integrity { count }),
        }
        tx.execute(
            "UPDATE settings SET
                indoor_sensor_address = ?1,
                outdoor_sensor_address = ?2,
                poll_interval_expression = ?3,
                fan_override_duration = ?4,
                updated_at = ?5",
            rusqlite::params![
                settings.indoor_sensor_address,
                settings.outdoor_sensor_address,
                settings.poll_interval_expression,
                settings.fan_override_duration_seconds as i64,
                format_ts(&Utc::now()),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let db = self.conn()?;
        count_rows(&db)
    }
}

fn count_rows(db: &Connection) -> Result<usize> {
    let n: i64 = db.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?;
    Ok(n as usize)
}

fn insert(db: &Connection, settings: &Settings) -> Result<()> {
    db.execute(
        "INSERT INTO settings
         (indoor_sensor_address, outdoor_sensor_address, poll_interval_expression,
          fan_override_duration, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            settings.indoor_sensor_address,
            settings.outdoor_sensor_address,
            settings.poll_interval_expression,
            settings.fan_override_duration_seconds as i64,
            format_ts(&Utc::now()),
        ],
    )?;
    Ok(())
}

fn select_one(db: &Connection) -> Result<Settings> {
    let settings = db.query_row(
        "SELECT indoor_sensor_address, outdoor_sensor_address,
                poll_interval_expression, fan_override_duration
         FROM settings LIMIT 1",
        [],
        |row| {
            Ok(Settings {
                indoor_sensor_address: row.get(0)?,
                outdoor_sensor_address: row.get(1)?,
                poll_interval_expression: row.get(2)?,
                fan_override_duration_seconds: row.get::<_, i64>(3)?.max(0) as u64,
            })
        },
    )?;
    Ok(settings)
}
