use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use climate_core::config::{SensorMode, SensorsConfig};
use climate_core::SettingsHandle;
use tracing::info;

use crate::device::DeviceSensor;
use crate::error::SensorError;
use crate::port::SensorPort;
use crate::retry::{RetryPolicy, RetryingSensor};
use crate::simulated::SimulatedSensor;
use crate::station::StationSensor;

const DEVICE_MODEL_PATH: &str = "/sys/firmware/devicetree/base/model";

/// Build the sensor used for the whole process lifetime.
///
/// `Auto` probes the device model once. On a Raspberry Pi it prefers sensors
/// attached to the board and falls back to the measuring stations when the
/// indoor device directory is absent. The result is wrapped in the
/// configured retry policy either way.
pub fn build_sensor(
    cfg: &SensorsConfig,
    settings: SettingsHandle,
) -> Result<Arc<dyn SensorPort>, SensorError> {
    let device = DeviceSensor::new(&cfg.indoor_device, &cfg.outdoor_device);
    let kind = resolve_kind(
        cfg.mode,
        is_raspberry_pi(Path::new(DEVICE_MODEL_PATH)),
        device.is_present(),
    );

    let inner: Arc<dyn SensorPort> = match kind {
        SensorKind::Device => Arc::new(device),
        SensorKind::Station => {
            let timeout = Duration::from_millis(cfg.request_timeout_ms);
            Arc::new(StationSensor::new(settings, timeout)?)
        }
        SensorKind::Simulated => Arc::new(SimulatedSensor::new()),
    };

    let policy = RetryPolicy::from(cfg);
    info!(
        mode = ?cfg.mode,
        sensor = inner.name(),
        max_attempts = policy.max_attempts,
        "sensor selected"
    );
    Ok(Arc::new(RetryingSensor::new(inner, policy)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SensorKind {
    Device,
    Station,
    Simulated,
}

fn resolve_kind(mode: SensorMode, on_pi: bool, device_present: bool) -> SensorKind {
    match mode {
        SensorMode::Device => SensorKind::Device,
        SensorMode::Station => SensorKind::Station,
        SensorMode::Simulated => SensorKind::Simulated,
        SensorMode::Auto if !on_pi => SensorKind::Simulated,
        SensorMode::Auto if device_present => SensorKind::Device,
        SensorMode::Auto => SensorKind::Station,
    }
}

fn is_raspberry_pi(model_file: &Path) -> bool {
    std::fs::read_to_string(model_file)
        .map(|model| model.to_lowercase().contains("raspberry pi"))
        .unwrap_or(false)
}
