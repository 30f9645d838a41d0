use std::ops::RangeInclusive;

use async_trait::async_trait;
use climate_core::{Measurement, Station};
use rand::Rng;

use crate::error::SensorError;
use crate::port::SensorPort;

const TEMPERATURE_RANGE: RangeInclusive<i32> = 15..=30;
const HUMIDITY_RANGE: RangeInclusive<i32> = 60..=100;

/// Stand-in for machines without sensors attached.
///
/// Returns whole-number values drawn uniformly from fixed ranges,
/// independently per call and per station.
#[derive(Debug, Default, Clone)]
pub struct SimulatedSensor;

impl SimulatedSensor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SensorPort for SimulatedSensor {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn read(&self, _station: Station) -> Result<Measurement, SensorError> {
        let mut rng = rand::thread_rng();
        let temperature = rng.gen_range(TEMPERATURE_RANGE);
        let humidity = rng.gen_range(HUMIDITY_RANGE);
        Ok(Measurement::new(f64::from(temperature), f64::from(humidity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_stay_within_ranges() {
        let sensor = SimulatedSensor::new();
        for station in [Station::Indoor, Station::Outdoor] {
            for _ in 0..200 {
                let m = sensor.read(station).await.unwrap();
                assert!((15.0..=30.0).contains(&m.temperature));
                assert!((60.0..=100.0).contains(&m.humidity));
                assert_eq!(m.temperature.fract(), 0.0);
            }
        }
    }
}
