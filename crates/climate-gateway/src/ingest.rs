use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use climate_core::{Reading, Station};
use climate_protocol::EventFrame;
use climate_scheduler::{Job, JobError};
use climate_sensors::SensorPort;
use climate_store::ReadingStore;
use tracing::info;

use crate::ws::fanout::NotificationFanout;

pub const INGEST_JOB_NAME: &str = "ingest_readings";

/// Poll both stations, persist one reading, notify observers.
///
/// A sensor that exhausts its retries aborts this run only; nothing is
/// persisted for it.
pub struct IngestionJob {
    sensor: Arc<dyn SensorPort>,
    readings: Arc<ReadingStore>,
    fanout: Arc<NotificationFanout>,
}

impl IngestionJob {
    pub fn new(
        sensor: Arc<dyn SensorPort>,
        readings: Arc<ReadingStore>,
        fanout: Arc<NotificationFanout>,
    ) -> Self {
        Self {
            sensor,
            readings,
            fanout,
        }
    }
}

#[async_trait]
impl Job for IngestionJob {
    fn name(&self) -> &str {
        INGEST_JOB_NAME
    }

    async fn run(&self) -> Result<(), JobError> {
        let indoor = self.sensor.read(Station::Indoor).await?;
        let outdoor = self.sensor.read(Station::Outdoor).await?;

        let reading = Reading::from_measurements(Utc::now().trunc_subsecs(6), indoor, outdoor);
        self.readings.append(&reading)?;

        let delivered = self.fanout.publish(EventFrame::reading(&reading));
        info!(
            ts = %reading.timestamp,
            indoor_temp = reading.indoor_temp,
            outdoor_temp = reading.outdoor_temp,
            delivered,
            "reading ingested"
        );
        Ok(())
    }
}
