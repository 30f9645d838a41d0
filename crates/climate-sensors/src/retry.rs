use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use climate_core::config::SensorsConfig;
use climate_core::{Measurement, Station};
use tracing::{info, warn};

use crate::error::SensorError;
use crate::port::SensorPort;

/// Fixed-delay retry budget for sensor reads.
///
/// Errors are not classified: every failure is retried until the budget is
/// spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: climate_core::config::SENSOR_MAX_ATTEMPTS,
            delay: Duration::from_millis(climate_core::config::SENSOR_RETRY_DELAY_MS),
        }
    }
}

impl From<&SensorsConfig> for RetryPolicy {
    fn from(cfg: &SensorsConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            delay: Duration::from_millis(cfg.retry_delay_ms),
        }
    }
}

/// Wraps a [`SensorPort`] and applies a [`RetryPolicy`] to every read.
///
/// The delay between attempts is a Tokio timer, so other tasks keep running
/// while a station is being retried.
pub struct RetryingSensor {
    inner: Arc<dyn SensorPort>,
    policy: RetryPolicy,
}

impl RetryingSensor {
    pub fn new(inner: Arc<dyn SensorPort>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl SensorPort for RetryingSensor {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn read(&self, station: Station) -> Result<Measurement, SensorError> {
        let max = self.policy.max_attempts;

        for attempt in 1..=max {
            match self.inner.read(station).await {
                Ok(m) => {
                    if attempt > 1 {
                        info!(%station, attempt, "sensor read succeeded after retry");
                    }
                    return Ok(m);
                }
                Err(e) => {
                    warn!(
                        %station,
                        sensor = %self.inner.name(),
                        attempt,
                        max,
                        error = %e,
                        "sensor read failed"
                    );
                    if attempt < max {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(SensorError::Communication {
            station,
            attempts: max,
        })
    }
}
