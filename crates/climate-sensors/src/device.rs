use std::path::{Path, PathBuf};

use async_trait::async_trait;
use climate_core::{Measurement, Station};
use tracing::debug;

use crate::error::SensorError;
use crate::port::SensorPort;

const TEMPERATURE_CHANNEL: &str = "in_temp_input";
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

/// DHT22 sensors attached directly to the board through the kernel `dht11`
/// IIO driver.
///
/// Each station maps to one IIO device directory; the driver reports
/// millidegrees Celsius and milli-percent relative humidity.
#[derive(Debug, Clone)]
pub struct DeviceSensor {
    indoor: PathBuf,
    outdoor: PathBuf,
}

impl DeviceSensor {
    pub fn new(indoor: impl Into<PathBuf>, outdoor: impl Into<PathBuf>) -> Self {
        Self {
            indoor: indoor.into(),
            outdoor: outdoor.into(),
        }
    }

    /// Whether the indoor device directory exists on this machine.
    pub fn is_present(&self) -> bool {
        self.indoor.is_dir()
    }

    fn device_dir(&self, station: Station) -> &Path {
        match station {
            Station::Indoor => &self.indoor,
            Station::Outdoor => &self.outdoor,
        }
    }
}

#[async_trait]
impl SensorPort for DeviceSensor {
    fn name(&self) -> &str {
        "device"
    }

    async fn read(&self, station: Station) -> Result<Measurement, SensorError> {
        let dir = self.device_dir(station);
        let temperature = read_channel(station, &dir.join(TEMPERATURE_CHANNEL)).await?;
        let humidity = read_channel(station, &dir.join(HUMIDITY_CHANNEL)).await?;
        debug!(%station, temperature, humidity, "device read");
        Ok(Measurement::new(temperature, humidity))
    }
}

/// Read one IIO channel and scale it from milli-units.
async fn read_channel(station: Station, path: &Path) -> Result<f64, SensorError> {
    // The driver answers EIO when the sensor misses a checksum; retried upstream.
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SensorError::Transient {
            station,
            reason: format!("{}: {e}", path.display()),
        })?;
    let milli: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SensorError::Malformed(format!("{}: {:?}", path.display(), raw.trim())))?;
    Ok(milli as f64 / 1000.0)
}
