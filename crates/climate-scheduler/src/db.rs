use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `job_runs` ledger table (idempotent). One row per job name;
/// counters are updated in place.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS job_runs (
            name          TEXT    NOT NULL PRIMARY KEY,
            expression    TEXT    NOT NULL,
            status        TEXT    NOT NULL DEFAULT 'pending',
            last_run      TEXT,               -- ISO-8601 or NULL
            next_run      TEXT,               -- ISO-8601 or NULL
            run_count     INTEGER NOT NULL DEFAULT 0,
            failure_count INTEGER NOT NULL DEFAULT 0,
            skipped_count INTEGER NOT NULL DEFAULT 0,
            updated_at    TEXT    NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
