use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type returned by a job body. Any error is accepted; the scheduler
/// only logs and records it.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// The work executed on every fire.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Stable name, used as the ledger key.
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), JobError>;
}

/// Last observed state of a scheduled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its next fire.
    Pending,
    /// A run is executing.
    Running,
    /// The last run finished successfully.
    Completed,
    /// The last run returned an error.
    Failed,
    /// The last fire was dropped because a run was still in flight.
    Skipped,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "skipped" => Ok(JobStatus::Skipped),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A row of the job ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job name: primary key.
    pub name: String,
    /// Cron expression currently driving the job.
    pub expression: String,
    pub status: JobStatus,
    /// ISO-8601 timestamp of the most recent fire that started a run.
    pub last_run: Option<String>,
    /// ISO-8601 timestamp of the next planned fire, if any.
    pub next_run: Option<String>,
    /// Runs that finished, successfully or not.
    pub run_count: u32,
    pub failure_count: u32,
    /// Fires dropped because the previous run was still executing.
    pub skipped_count: u32,
    pub updated_at: String,
}
