use crate::door::{DoorState, RawSample};
use crate::error::AppError;

pub mod iio;
#[cfg(target_os = "linux")]
pub mod indicator;
pub mod mcp3008;
pub mod mock;

/// Raw analog sampling of the distance sensor.
pub trait AnalogSensor {
    fn read_raw(&mut self) -> Result<RawSample, AppError>;
}

/// Temperature/humidity source. Each quantity can fail independently.
pub trait ClimateSensor {
    /// Relative humidity in percent.
    fn read_humidity(&mut self) -> Result<f32, AppError>;
    /// Temperature in degrees Celsius.
    fn read_temperature(&mut self) -> Result<f32, AppError>;
}

/// Two mutually exclusive status lights, one per door state.
pub trait IndicatorSink {
    fn show(&mut self, state: DoorState) -> Result<(), AppError>;
}

/// Absent indicators: the loop runs without status lights.
impl<I: IndicatorSink> IndicatorSink for Option<I> {
    fn show(&mut self, state: DoorState) -> Result<(), AppError> {
        match self {
            Some(indicators) => indicators.show(state),
            None => Ok(()),
        }
    }
}
