//! DHT11/DHT22 climate sensor read through the kernel IIO `dht11` driver.
//!
//! The driver exposes milli-units in sysfs; a read that times out on the
//! one-wire bus surfaces as an I/O error (usually `EIO` or `ETIMEDOUT`).

use crate::error::AppError;
use crate::sensor::ClimateSensor;
use std::path::{Path, PathBuf};

pub const DEFAULT_DEVICE_PATH: &str = "/sys/bus/iio/devices/iio:device0";

const TEMPERATURE_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

#[derive(Debug, Clone)]
pub struct IioClimateSensor {
    device: PathBuf,
}

impl IioClimateSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn read_milli(&self, file: &str) -> Result<f32, AppError> {
        let path = self.device.join(file);
        let contents = std::fs::read_to_string(&path)
            .map_err(|err| AppError::Sensor(format!("{}: {err}", path.display())))?;
        let milli: i32 = contents.trim().parse().map_err(|err| {
            AppError::Sensor(format!("{}: invalid value {:?}: {err}", path.display(), contents.trim()))
        })?;
        Ok(milli as f32 / 1000.0)
    }
}

impl ClimateSensor for IioClimateSensor {
    fn read_humidity(&mut self) -> Result<f32, AppError> {
        self.read_milli(HUMIDITY_FILE)
    }

    fn read_temperature(&mut self) -> Result<f32, AppError> {
        self.read_milli(TEMPERATURE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_device(name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let dir = std::env::temp_dir().join(format!("garage-sense-iio-{name}-{unique}"));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[test]
    fn reads_milli_units() -> Result<(), Box<dyn std::error::Error>> {
        let dir = temp_device("ok")?;
        fs::write(dir.join(TEMPERATURE_FILE), "21500\n")?;
        fs::write(dir.join(HUMIDITY_FILE), "48250\n")?;
        let mut sensor = IioClimateSensor::new(&dir);

        let temperature = sensor.read_temperature()?;
        let humidity = sensor.read_humidity()?;
        let _ = fs::remove_dir_all(&dir);

        assert!((temperature - 21.5).abs() < f32::EPSILON);
        assert!((humidity - 48.25).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn missing_humidity_does_not_affect_temperature() -> Result<(), Box<dyn std::error::Error>> {
        let dir = temp_device("partial")?;
        fs::write(dir.join(TEMPERATURE_FILE), "-4000\n")?;
        let mut sensor = IioClimateSensor::new(&dir);

        let humidity = sensor.read_humidity();
        let temperature = sensor.read_temperature()?;
        let _ = fs::remove_dir_all(&dir);

        assert!(matches!(humidity, Err(AppError::Sensor(_))));
        assert!((temperature + 4.0).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn garbage_value_is_a_sensor_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = temp_device("garbage")?;
        fs::write(dir.join(HUMIDITY_FILE), "n/a")?;
        let mut sensor = IioClimateSensor::new(&dir);

        let result = sensor.read_humidity();
        let _ = fs::remove_dir_all(&dir);

        match result {
            Err(AppError::Sensor(message)) => assert!(message.contains("invalid value")),
            other => panic!("expected sensor error, got {other:?}"),
        }
        Ok(())
    }
}
