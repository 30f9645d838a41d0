use async_trait::async_trait;
use climate_core::{Measurement, Station};

use crate::error::SensorError;

/// A temperature/humidity source.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// by the ingestion job and anything else that wants an ad-hoc reading.
#[async_trait]
pub trait SensorPort: Send + Sync {
    /// Short identifier for logs (e.g. `"simulated"`).
    fn name(&self) -> &str;

    /// Take one measurement. A single attempt; retrying is the caller's job.
    async fn read(&self, station: Station) -> Result<Measurement, SensorError>;
}
