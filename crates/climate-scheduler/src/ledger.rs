use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::{
    db::init_db,
    error::Result,
    types::{JobRecord, JobStatus},
};

/// Persistent record of what the scheduler did.
///
/// Uses its own `Connection` so HTTP handlers can list jobs without
/// contending with the stores used by the ingestion run.
pub struct JobLedger {
    conn: Mutex<Connection>,
}

impl JobLedger {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("job ledger lock was poisoned; continuing");
            poisoned.into_inner()
        })
    }

    /// Create the row for `name`, or point an existing one at a new
    /// expression. Counters survive restarts and reconfiguration.
    pub fn register(
        &self,
        name: &str,
        expression: &str,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO job_runs (name, expression, status, next_run, updated_at)
             VALUES (?1, ?2, 'pending', ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                expression = excluded.expression,
                next_run   = excluded.next_run,
                updated_at = excluded.updated_at",
            rusqlite::params![name, expression, next_run.map(|t| t.to_rfc3339()), now],
        )?;
        debug!(job = %name, %expression, "job registered in ledger");
        Ok(())
    }

    pub fn record_started(&self, name: &str, fired_at: DateTime<Utc>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE job_runs SET status = 'running', last_run = ?1, updated_at = ?2
             WHERE name = ?3",
            rusqlite::params![fired_at.to_rfc3339(), now, name],
        )?;
        Ok(())
    }

    pub fn record_finished(&self, name: &str, succeeded: bool) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let (status, failed) = if succeeded {
            (JobStatus::Completed, 0)
        } else {
            (JobStatus::Failed, 1)
        };
        self.conn().execute(
            "UPDATE job_runs SET status = ?1,
                run_count = run_count + 1,
                failure_count = failure_count + ?2,
                updated_at = ?3
             WHERE name = ?4",
            rusqlite::params![status.to_string(), failed, now, name],
        )?;
        Ok(())
    }

    pub fn record_skipped(&self, name: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE job_runs SET status = 'skipped',
                skipped_count = skipped_count + 1,
                updated_at = ?1
             WHERE name = ?2",
            rusqlite::params![now, name],
        )?;
        Ok(())
    }

    pub fn set_next_run(&self, name: &str, next_run: Option<DateTime<Utc>>) -> Result<()> {
        self.conn().execute(
            "UPDATE job_runs SET next_run = ?1 WHERE name = ?2",
            rusqlite::params![next_run.map(|t| t.to_rfc3339()), name],
        )?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<JobRecord>> {
        Ok(self.list()?.into_iter().find(|r| r.name == name))
    }

    /// All jobs ordered by name.
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, expression, status, last_run, next_run,
                    run_count, failure_count, skipped_count, updated_at
             FROM job_runs ORDER BY name",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,         // name
                    row.get::<_, String>(1)?,         // expression
                    row.get::<_, String>(2)?,         // status
                    row.get::<_, Option<String>>(3)?, // last_run
                    row.get::<_, Option<String>>(4)?, // next_run
                    row.get::<_, u32>(5)?,            // run_count
                    row.get::<_, u32>(6)?,            // failure_count
                    row.get::<_, u32>(7)?,            // skipped_count
                    row.get::<_, String>(8)?,         // updated_at
                ))
            })?
            .filter_map(|r| {
                let (
                    name,
                    expression,
                    status_str,
                    last_run,
                    next_run,
                    run_count,
                    failure_count,
                    skipped_count,
                    updated_at,
                ) = r.ok()?;
                let status: JobStatus = status_str.parse().ok()?;
                Some(JobRecord {
                    name,
                    expression,
                    status,
                    last_run,
                    next_run,
                    run_count,
                    failure_count,
                    skipped_count,
                    updated_at,
                })
            })
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ledger() -> JobLedger {
        JobLedger::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn lifecycle_updates_counters() {
        let l = ledger();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        l.register("ingest", "*/30 * * * *", Some(at)).unwrap();

        let rec = l.get("ingest").unwrap().unwrap();
        assert_eq!(rec.status, JobStatus::Pending);
        assert_eq!(rec.next_run.as_deref(), Some(at.to_rfc3339().as_str()));

        l.record_started("ingest", at).unwrap();
        assert_eq!(l.get("ingest").unwrap().unwrap().status, JobStatus::Running);

        l.record_skipped("ingest").unwrap();
        l.record_finished("ingest", false).unwrap();
        l.record_started("ingest", at).unwrap();
        l.record_finished("ingest", true).unwrap();

        let rec = l.get("ingest").unwrap().unwrap();
        assert_eq!(rec.status, JobStatus::Completed);
        assert_eq!(rec.run_count, 2);
        assert_eq!(rec.failure_count, 1);
        assert_eq!(rec.skipped_count, 1);
        assert_eq!(rec.last_run.as_deref(), Some(at.to_rfc3339().as_str()));
    }

    #[test]
    fn re_register_keeps_counters() {
        let l = ledger();
        l.register("ingest", "*/30 * * * *", None).unwrap();
        l.record_finished("ingest", true).unwrap();
        l.register("ingest", "*/5 * * * *", None).unwrap();

        let all = l.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].expression, "*/5 * * * *");
        assert_eq!(all[0].run_count, 1);
    }

    #[test]
    fn unknown_job_is_none() {
        assert!(ledger().get("nope").unwrap().is_none());
    }
}
