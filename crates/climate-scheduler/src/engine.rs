use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    cron::CronSchedule,
    error::{Result, SchedulerError},
    ledger::JobLedger,
    types::Job,
};

enum Command {
    Reconfigure {
        schedule: CronSchedule,
        ack: oneshot::Sender<Option<DateTime<Utc>>>,
    },
}

/// State shared between the handle, the driver task and run tasks.
struct Shared {
    job: Arc<dyn Job>,
    ledger: Arc<JobLedger>,
    in_flight: AtomicBool,
    idle: Notify,
    next_fire: Mutex<Option<DateTime<Utc>>>,
    fires: AtomicU64,
    skipped: AtomicU64,
}

impl Shared {
    fn next_fire_slot(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        self.next_fire.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn job_name(&self) -> &str {
        self.job.name()
    }
}

/// Clears the in-flight flag when a run ends, including by panic.
struct InFlightGuard(Arc<Shared>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
        self.0.idle.notify_waiters();
    }
}

struct Driver {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Cron-driven trigger for a single [`Job`].
///
/// Nothing runs until [`schedule`](Self::schedule) is called. After that a
/// driver task owns the trigger and is steered through a command channel.
pub struct IngestionScheduler {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl IngestionScheduler {
    pub fn new(job: Arc<dyn Job>, ledger: Arc<JobLedger>) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                ledger,
                in_flight: AtomicBool::new(false),
                idle: Notify::new(),
                next_fire: Mutex::new(None),
                fires: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
            driver: Mutex::new(None),
        }
    }

    fn driver_slot(&self) -> MutexGuard<'_, Option<Driver>> {
        self.driver.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Install the recurring trigger, starting the driver on first call.
    /// Later calls behave like [`reconfigure`](Self::reconfigure).
    pub async fn schedule(&self, expression: &str) -> Result<Option<DateTime<Utc>>> {
        let schedule = CronSchedule::parse(expression)?;
        {
            let mut slot = self.driver_slot();
            if slot.is_none() {
                let next = schedule.next_after(Utc::now());
                *self.shared.next_fire_slot() = next;
                if let Err(e) =
                    self.shared
                        .ledger
                        .register(self.shared.job_name(), schedule.expression(), next)
                {
                    warn!(job = %self.shared.job_name(), error = %e, "ledger register failed");
                }

                let (tx, rx) = mpsc::channel(8);
                let cancel = CancellationToken::new();
                info!(
                    job = %self.shared.job_name(),
                    expression = %schedule.expression(),
                    next_fire = ?next,
                    "scheduler started"
                );
                let task = tokio::spawn(drive(
                    Arc::clone(&self.shared),
                    schedule,
                    next,
                    rx,
                    cancel.clone(),
                ));
                *slot = Some(Driver {
                    commands: tx,
                    cancel,
                    task,
                });
                return Ok(next);
            }
        }
        self.send_reconfigure(schedule).await
    }

    /// Swap the trigger expression.
    ///
    /// Returns the next fire computed from `expression` against the current
    /// instant, once the driver has adopted it. An invalid expression is
    /// rejected and the running trigger is left untouched.
    pub async fn reconfigure(&self, expression: &str) -> Result<Option<DateTime<Utc>>> {
        let schedule = CronSchedule::parse(expression)?;
        self.send_reconfigure(schedule).await
    }

    async fn send_reconfigure(&self, schedule: CronSchedule) -> Result<Option<DateTime<Utc>>> {
        let commands = self
            .driver_slot()
            .as_ref()
            .map(|d| d.commands.clone())
            .ok_or(SchedulerError::NotRunning)?;

        let (ack_tx, ack_rx) = oneshot::channel();
        commands
            .send(Command::Reconfigure {
                schedule,
                ack: ack_tx,
            })
            .await
            .map_err(|_| SchedulerError::NotRunning)?;
        ack_rx.await.map_err(|_| SchedulerError::NotRunning)
    }

    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        *self.shared.next_fire_slot()
    }

    /// Whether the trigger is installed and has not been shut down.
    pub fn is_running(&self) -> bool {
        self.driver_slot()
            .as_ref()
            .is_some_and(|d| !d.cancel.is_cancelled() && !d.task.is_finished())
    }

    /// Whether a job run is executing right now.
    pub fn run_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Fires that started a run.
    pub fn fire_count(&self) -> u64 {
        self.shared.fires.load(Ordering::Relaxed)
    }

    /// Fires dropped because a run was already executing.
    pub fn skipped_count(&self) -> u64 {
        self.shared.skipped.load(Ordering::Relaxed)
    }

    /// Stop the trigger and wait up to `timeout` for an in-flight run.
    ///
    /// The trigger is stopped even when the wait times out; the run itself
    /// keeps going in the background until the runtime exits.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let driver = self.driver_slot().take().ok_or(SchedulerError::NotRunning)?;
        driver.cancel.cancel();
        if let Err(e) = driver.task.await {
            error!(error = %e, "scheduler driver task failed");
        }
        *self.shared.next_fire_slot() = None;

        let shared = Arc::clone(&self.shared);
        let drained = tokio::time::timeout(timeout, async move {
            loop {
                let notified = shared.idle.notified();
                if !shared.in_flight.load(Ordering::Acquire) {
                    break;
                }
                notified.await;
            }
        })
        .await;

        match drained {
            Ok(()) => {
                info!(job = %self.shared.job_name(), "scheduler stopped");
                Ok(())
            }
            Err(_) => {
                warn!(
                    job = %self.shared.job_name(),
                    timeout_secs = timeout.as_secs(),
                    "in-flight run still executing at shutdown"
                );
                Err(SchedulerError::ShutdownTimeout {
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }
}

/// Earliest instant the next fire may be computed from. Never before the
/// last fire, so one instant cannot trigger twice.
fn anchor(last_fire: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last_fire {
        Some(last) if last > now => last,
        _ => now,
    }
}

async fn sleep_until(at: Option<DateTime<Utc>>) {
    match at {
        Some(at) => {
            let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
        }
        None => std::future::pending().await,
    }
}

async fn drive(
    shared: Arc<Shared>,
    mut schedule: CronSchedule,
    mut next: Option<DateTime<Utc>>,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) {
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        *shared.next_fire_slot() = next;

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(job = %shared.job_name(), "scheduler driver cancelled");
                break;
            }

            cmd = commands.recv() => match cmd {
                Some(Command::Reconfigure { schedule: new_schedule, ack }) => {
                    schedule = new_schedule;
                    next = schedule.next_after(anchor(last_fire));
                    *shared.next_fire_slot() = next;
                    if let Err(e) = shared.ledger.register(shared.job_name(), schedule.expression(), next) {
                        warn!(job = %shared.job_name(), error = %e, "ledger register failed");
                    }
                    info!(
                        job = %shared.job_name(),
                        expression = %schedule.expression(),
                        next_fire = ?next,
                        "trigger reconfigured"
                    );
                    let _ = ack.send(next);
                }
                None => break,
            },

            _ = sleep_until(next) => {
                let Some(fired_at) = next else { continue };
                last_fire = Some(fired_at);
                fire(&shared, fired_at);
                next = schedule.next_after(anchor(last_fire));
                if let Err(e) = shared.ledger.set_next_run(shared.job_name(), next) {
                    warn!(job = %shared.job_name(), error = %e, "ledger update failed");
                }
            }
        }
    }
}

fn fire(shared: &Arc<Shared>, fired_at: DateTime<Utc>) {
    let name = shared.job_name().to_string();

    if shared
        .in_flight
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        shared.skipped.fetch_add(1, Ordering::Relaxed);
        warn!(job = %name, %fired_at, "previous run still in flight, fire skipped");
        if let Err(e) = shared.ledger.record_skipped(&name) {
            warn!(job = %name, error = %e, "ledger update failed");
        }
        return;
    }

    let guard = InFlightGuard(Arc::clone(shared));
    shared.fires.fetch_add(1, Ordering::Relaxed);
    if let Err(e) = shared.ledger.record_started(&name, fired_at) {
        warn!(job = %name, error = %e, "ledger update failed");
    }

    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let started = std::time::Instant::now();
        info!(job = %name, %fired_at, "job run started");

        let result = shared.job.run().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(job = %name, elapsed_ms, "job run completed"),
            Err(e) => error!(job = %name, elapsed_ms, error = %e, "job run failed"),
        }
        if let Err(e) = shared.ledger.record_finished(&name, result.is_ok()) {
            warn!(job = %name, error = %e, "ledger update failed");
        }
        drop(guard);
    });
}
