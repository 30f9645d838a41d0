//! `climate-scheduler`: runtime-reconfigurable cron trigger for the
//! ingestion job.
//!
//! # Overview
//!
//! [`IngestionScheduler`] owns one driver task that sleeps until the next
//! cron instant and then spawns the [`Job`]. The trigger expression can be
//! swapped at runtime with [`IngestionScheduler::reconfigure`]; the call
//! returns once the driver has adopted the new expression.
//!
//! Guarantees:
//!
//! - at most one run executes at a time; a fire that lands while a run is
//!   still going is skipped and counted,
//! - a failing run is logged and recorded but never stops later fires,
//! - reconfiguring never aborts the in-flight run, and never fires twice
//!   for the same instant.
//!
//! Every fire, skip and outcome is mirrored into the SQLite `job_runs`
//! table ([`JobLedger`]) so it can be inspected over HTTP.

pub mod cron;
pub mod db;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod types;

pub use cron::CronSchedule;
pub use engine::IngestionScheduler;
pub use error::{Result, SchedulerError};
pub use ledger::JobLedger;
pub use types::{Job, JobError, JobRecord, JobStatus};
