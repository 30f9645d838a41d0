//! Physical sensors behind a measuring station.
//!
//! A station is a small HTTP service on the device that owns the sensors.
//! `GET {address}/get/` answers with both channels:
//!
//! ```json
//! { "temp": { "indoor": 21.4, "outdoor": 9.8 },
//!   "humid": { "indoor": 54.0, "outdoor": 81.0 } }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use climate_core::{ClimateError, Measurement, SettingsHandle, Station};
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::error::SensorError;
use crate::port::SensorPort;

#[derive(Debug, Deserialize)]
struct StationPair {
    indoor: Option<f64>,
    outdoor: Option<f64>,
}

impl StationPair {
    fn pick(&self, station: Station) -> Option<f64> {
        match station {
            Station::Indoor => self.indoor,
            Station::Outdoor => self.outdoor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StationResponse {
    temp: StationPair,
    humid: StationPair,
}

pub struct StationSensor {
    client: reqwest::Client,
    settings: SettingsHandle,
}

impl StationSensor {
    /// The station address is looked up in `settings` on every read, so
    /// address changes apply to the next poll.
    pub fn new(settings: SettingsHandle, timeout: Duration) -> Result<Self, SensorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, station: Station) -> Result<Url, SensorError> {
        let settings = self.settings.current();
        let base = parse_address(settings.address_for(station))
            .map_err(|e| SensorError::Malformed(e.to_string()))?;
        base.join("get/")
            .map_err(|e| SensorError::Malformed(format!("bad station address: {e}")))
    }
}

#[async_trait]
impl SensorPort for StationSensor {
    fn name(&self) -> &str {
        "station"
    }

    async fn read(&self, station: Station) -> Result<Measurement, SensorError> {
        let url = self.endpoint(station)?;
        debug!(%station, %url, "querying measuring station");

        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body: StationResponse = resp
            .json()
            .await
            .map_err(|e| SensorError::Malformed(e.to_string()))?;
        measurement_from(&body, station)
    }
}

fn measurement_from(body: &StationResponse, station: Station) -> Result<Measurement, SensorError> {
    match (body.temp.pick(station), body.humid.pick(station)) {
        (Some(t), Some(h)) => Ok(Measurement::new(t, h)),
        _ => Err(SensorError::Transient {
            station,
            reason: "station returned no value for this channel".to_string(),
        }),
    }
}

/// Validate a station address: an absolute `http`/`https` URL with a host.
///
/// The returned URL always ends in `/` so relative joins keep the path.
pub fn parse_address(address: &str) -> Result<Url, ClimateError> {
    let mut url = Url::parse(address)
        .map_err(|e| ClimateError::validation("address", format!("invalid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClimateError::validation(
            "address",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(ClimateError::validation("address", "missing host")),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
