use crate::agent::{DEFAULT_SAMPLE_INTERVAL, Timing, Topics};
use crate::clock::MAX_INTERVAL_MS;
use crate::door::model::DEFAULT_THRESHOLD_CM;
use crate::door::{Calibration, DistanceModel};
use crate::identity::DEFAULT_NETWORK_INTERFACE;
use crate::link::mqtt::{
    DEFAULT_BROKER_PORT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEP_ALIVE, MqttSettings,
};
use crate::link::{DEFAULT_CLIENT_ID_PREFIX, DEFAULT_RECONNECT_BACKOFF};
use crate::sensor::iio::DEFAULT_DEVICE_PATH;
use crate::sensor::mcp3008::CHANNEL_COUNT;
use crate::telemetry::DEFAULT_TELEMETRY_INTERVAL;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_BROKER_HOST: &str = "192.168.0.9";
/// rumqttc rejects shorter keep-alive intervals.
const MIN_KEEP_ALIVE_SECS: u64 = 5;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub broker: BrokerSection,
    #[serde(default)]
    pub topics: Topics,
    #[serde(default)]
    pub door: DoorSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub hardware: HardwareSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrokerSection {
    pub host: String,
    pub port: u16,
    /// Prefix of the randomized client identifier sent on every connect.
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
    /// How long one connection attempt may wait for the broker's CONNACK.
    pub connect_timeout_ms: u64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE.as_secs(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DoorSection {
    /// Distances at or above this are an open door.
    pub threshold_cm: f64,
    /// Width of the band below the threshold that keeps an open door open.
    /// Zero selects plain single-threshold classification.
    pub hysteresis_cm: f64,
    pub calibration: Calibration,
}

impl Default for DoorSection {
    fn default() -> Self {
        Self {
            threshold_cm: DEFAULT_THRESHOLD_CM,
            hysteresis_cm: 0.0,
            calibration: Calibration::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingSection {
    /// Idle wait at the end of every tick.
    pub sample_interval_ms: u64,
    /// Minimum time between climate reports and liveness pings.
    pub telemetry_interval_ms: u64,
    /// Wait between failed broker connection attempts.
    pub reconnect_backoff_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL.as_millis() as u64,
            telemetry_interval_ms: DEFAULT_TELEMETRY_INTERVAL.as_millis() as u64,
            reconnect_backoff_ms: DEFAULT_RECONNECT_BACKOFF.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HardwareSection {
    pub spi_bus: u8,
    pub spi_slave_select: u8,
    /// MCP3008 input the distance sensor is wired to.
    pub adc_channel: u8,
    /// BCM pin of the green LED.
    pub open_led_pin: u8,
    /// BCM pin of the red LED.
    pub closed_led_pin: u8,
    pub climate_device: PathBuf,
    pub network_interface: String,
}

impl Default for HardwareSection {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_slave_select: 0,
            adc_channel: 0,
            open_led_pin: 23,
            closed_led_pin: 24,
            climate_device: PathBuf::from(DEFAULT_DEVICE_PATH),
            network_interface: DEFAULT_NETWORK_INTERFACE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        for (name, value) in [
            ("timing.sample_interval_ms", timing.sample_interval_ms),
            ("timing.telemetry_interval_ms", timing.telemetry_interval_ms),
            ("timing.reconnect_backoff_ms", timing.reconnect_backoff_ms),
            ("broker.connect_timeout_ms", self.broker.connect_timeout_ms),
        ] {
            if value == 0 || value > MAX_INTERVAL_MS {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {MAX_INTERVAL_MS}, got {value}"
                )));
            }
        }
        if self.broker.keep_alive_secs < MIN_KEEP_ALIVE_SECS {
            return Err(ConfigError::Invalid(format!(
                "broker.keep_alive_secs must be at least {MIN_KEEP_ALIVE_SECS}"
            )));
        }
        if !(self.door.threshold_cm.is_finite() && self.door.threshold_cm > 0.0) {
            return Err(ConfigError::Invalid(
                "door.threshold_cm must be a positive number".to_string(),
            ));
        }
        if !(self.door.hysteresis_cm.is_finite() && self.door.hysteresis_cm >= 0.0) {
            return Err(ConfigError::Invalid(
                "door.hysteresis_cm must not be negative".to_string(),
            ));
        }
        if self.hardware.adc_channel >= CHANNEL_COUNT {
            return Err(ConfigError::Invalid(format!(
                "hardware.adc_channel must be below {CHANNEL_COUNT}"
            )));
        }
        if self.hardware.open_led_pin == self.hardware.closed_led_pin {
            return Err(ConfigError::Invalid(
                "hardware.open_led_pin and hardware.closed_led_pin must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Max tracing level from `[logging].level`, defaulting to INFO.
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }

    pub fn distance_model(&self) -> DistanceModel {
        DistanceModel::new(
            self.door.calibration.clone(),
            self.door.threshold_cm,
            self.door.hysteresis_cm,
        )
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            host: self.broker.host.clone(),
            port: self.broker.port,
            keep_alive: Duration::from_secs(self.broker.keep_alive_secs),
            connect_timeout: Duration::from_millis(self.broker.connect_timeout_ms),
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            sample_interval: Duration::from_millis(self.timing.sample_interval_ms),
            telemetry_interval: Duration::from_millis(self.timing.telemetry_interval_ms),
        }
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.timing.reconnect_backoff_ms)
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }
}
