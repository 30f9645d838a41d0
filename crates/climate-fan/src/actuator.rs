use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use climate_core::config::FanConfig;
use tracing::info;

use crate::error::{FanError, Result};

/// Pushes a recorded fan state to the hardware.
#[async_trait]
pub trait FanActuator: Send + Sync {
    fn name(&self) -> &str;

    async fn apply(&self, running: bool) -> Result<()>;
}

/// Used when no device is attached: the transition is only logged.
#[derive(Debug, Default)]
pub struct LogActuator;

#[async_trait]
impl FanActuator for LogActuator {
    fn name(&self) -> &str {
        "log"
    }

    async fn apply(&self, running: bool) -> Result<()> {
        info!(running, "fan state synced (no hardware attached)");
        Ok(())
    }
}

/// Writes `1` or `0` to a device file, e.g. a sysfs GPIO `value` file.
#[derive(Debug, Clone)]
pub struct FileActuator {
    path: PathBuf,
}

impl FileActuator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FanActuator for FileActuator {
    fn name(&self) -> &str {
        "file"
    }

    async fn apply(&self, running: bool) -> Result<()> {
        let value = if running { "1\n" } else { "0\n" };
        tokio::fs::write(&self.path, value)
            .await
            .map_err(|e| FanError::Actuator {
                actuator: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        info!(running, path = %self.path.display(), "fan state written to device");
        Ok(())
    }
}

pub fn actuator_from_config(cfg: &FanConfig) -> Arc<dyn FanActuator> {
    match &cfg.actuator_path {
        Some(path) => Arc::new(FileActuator::new(path)),
        None => Arc::new(LogActuator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_actuator_writes_binary_state() {
        let path = std::env::temp_dir().join(format!("climate-fan-{}", std::process::id()));
        let act = FileActuator::new(&path);

        act.apply(true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n");
        act.apply(false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0\n");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn file_actuator_reports_missing_device() {
        let act = FileActuator::new("/nonexistent-dir/gpio17/value");
        assert!(matches!(act.apply(true).await, Err(FanError::Actuator { .. })));
    }

    #[test]
    fn config_selects_actuator() {
        assert_eq!(actuator_from_config(&FanConfig::default()).name(), "log");
        let cfg = FanConfig {
            actuator_path: Some("/sys/class/gpio/gpio17/value".to_string()),
        };
        assert_eq!(actuator_from_config(&cfg).name(), "file");
    }
}
