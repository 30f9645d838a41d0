use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Cron expression used when no settings record exists yet.
pub const DEFAULT_POLL_INTERVAL: &str = "*/30 * * * *";
pub const DEFAULT_OVERRIDE_SECS: u64 = 3600;
pub const DEFAULT_INDOOR_ADDRESS: &str = "http://localhost:8001";
pub const DEFAULT_OUTDOOR_ADDRESS: &str = "http://localhost:8002";
/// Sensor reads are attempted this many times before the run is aborted.
pub const SENSOR_MAX_ATTEMPTS: u32 = 10;
pub const SENSOR_RETRY_DELAY_MS: u64 = 1_000;
pub const OBSERVER_QUEUE_CAPACITY: usize = 64;
/// IIO device directories the kernel `dht11` driver creates for two sensors.
pub const DEFAULT_INDOOR_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";
pub const DEFAULT_OUTDOOR_DEVICE: &str = "/sys/bus/iio/devices/iio:device1";

/// Top-level config (climate.toml + CLIMATE_* env overrides).
///
/// This is the static, file-based process config. The runtime-editable
/// record (sensor addresses, poll interval) lives in the database and is
/// exposed through [`crate::settings::SettingsHandle`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClimateConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub fan: FanConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Browser origins allowed by the CORS layer.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            auth: AuthConfig::default(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Static bearer token guarding the settings routes.
///
/// `None` disables the check entirely (trusted local network).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Which sensor implementation is injected at startup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SensorMode {
    /// On a Raspberry Pi: attached devices when present, measuring stations
    /// otherwise. Simulated everywhere else.
    #[default]
    Auto,
    Simulated,
    Station,
    Device,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsConfig {
    #[serde(default)]
    pub mode: SensorMode,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_indoor_device")]
    pub indoor_device: String,
    #[serde(default = "default_outdoor_device")]
    pub outdoor_device: String,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            mode: SensorMode::default(),
            max_attempts: SENSOR_MAX_ATTEMPTS,
            retry_delay_ms: SENSOR_RETRY_DELAY_MS,
            request_timeout_ms: default_request_timeout_ms(),
            indoor_device: default_indoor_device(),
            outdoor_device: default_outdoor_device(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanConfig {
    /// Device file the fan state is written to (e.g. a GPIO `value` file).
    /// When unset the hardware sync only logs.
    pub actuator_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How long shutdown waits for an in-flight ingestion run.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:5173".to_string(),
    ]
}
fn default_max_attempts() -> u32 {
    SENSOR_MAX_ATTEMPTS
}
fn default_retry_delay_ms() -> u64 {
    SENSOR_RETRY_DELAY_MS
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_indoor_device() -> String {
    DEFAULT_INDOOR_DEVICE.to_string()
}
fn default_outdoor_device() -> String {
    DEFAULT_OUTDOOR_DEVICE.to_string()
}
fn default_shutdown_timeout_secs() -> u64 {
    30
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.climate/climate.db", home)
}

impl ClimateConfig {
    /// Load config from a TOML file with CLIMATE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.climate/climate.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ClimateConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CLIMATE_").split("_"))
            .extract()
            .map_err(|e| crate::error::ClimateError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.climate/climate.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ClimateConfig::default();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.sensors.max_attempts, 10);
        assert_eq!(config.sensors.retry_delay_ms, 1_000);
        assert_eq!(config.sensors.mode, SensorMode::Auto);
        assert!(config.fan.actuator_path.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_serde_defaults() {
        let config = ClimateConfig::load(Some("/nonexistent/climate.toml")).unwrap();
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
        assert_eq!(config.scheduler.shutdown_timeout_secs, 30);
    }

    #[test]
    fn sensor_mode_parses_kebab_case() {
        let mode: SensorMode = serde_json::from_str(r#""simulated""#).unwrap();
        assert_eq!(mode, SensorMode::Simulated);
    }
}
