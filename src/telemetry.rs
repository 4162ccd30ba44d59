//! Periodic climate telemetry and liveness ping.

use crate::clock::MonotonicMillis;
use crate::error::AppError;
use crate::sensor::ClimateSensor;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_secs(10);
pub const PING_PAYLOAD: &str = "ping";
/// Published in place of a reading the sensor could not deliver.
pub const UNAVAILABLE_PAYLOAD: &str = "unavailable";

/// Outcome of reading one climate quantity.
pub type ClimateReading = Result<f32, AppError>;

#[derive(Debug)]
pub struct TelemetryBatch {
    pub humidity: ClimateReading,
    pub temperature: ClimateReading,
}

impl TelemetryBatch {
    pub fn humidity_payload(&self) -> String {
        format_reading(&self.humidity)
    }

    pub fn temperature_payload(&self) -> String {
        format_reading(&self.temperature)
    }
}

/// Fixed width 5, two decimals; failed readings become [`UNAVAILABLE_PAYLOAD`].
pub fn format_reading(reading: &ClimateReading) -> String {
    match reading {
        Ok(value) => format!("{value:5.2}"),
        Err(_) => UNAVAILABLE_PAYLOAD.to_string(),
    }
}

/// Drifting interval timer: each fire restarts the interval from the fire time.
#[derive(Debug)]
pub struct TelemetryScheduler {
    interval_ms: u32,
    last_fire: MonotonicMillis,
}

impl TelemetryScheduler {
    /// `interval` must stay below half the counter range; config validation enforces it.
    pub fn new(interval: Duration, started_at: MonotonicMillis) -> Self {
        Self {
            interval_ms: interval.as_millis().min(u128::from(u32::MAX)) as u32,
            last_fire: started_at,
        }
    }

    pub fn is_due(&self, now: MonotonicMillis) -> bool {
        now.elapsed_since(self.last_fire) >= self.interval_ms
    }

    pub fn maybe_run<C>(&mut self, now: MonotonicMillis, sensor: &mut C) -> Option<TelemetryBatch>
    where
        C: ClimateSensor + ?Sized,
    {
        if !self.is_due(now) {
            return None;
        }
        self.last_fire = now;

        let humidity = read_checked(sensor.read_humidity(), "humidity");
        let temperature = read_checked(sensor.read_temperature(), "temperature");
        let batch = TelemetryBatch {
            humidity,
            temperature,
        };
        info!(
            temperature = %batch.temperature_payload(),
            humidity = %batch.humidity_payload(),
            "Telemetry read"
        );
        Some(batch)
    }
}

fn read_checked(reading: ClimateReading, quantity: &'static str) -> ClimateReading {
    let reading = reading.and_then(|value| {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(AppError::Sensor(format!("{quantity} reading is not a number")))
        }
    });
    if let Err(ref err) = reading {
        warn!(quantity, error = %err, "Climate reading unavailable");
    }
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::mock::{MockClimateBehavior, MockClimateSensor};

    fn scheduler_at(start: u32) -> TelemetryScheduler {
        TelemetryScheduler::new(DEFAULT_TELEMETRY_INTERVAL, MonotonicMillis(start))
    }

    #[test]
    fn does_not_fire_before_interval() {
        let mut scheduler = scheduler_at(0);
        let mut sensor = MockClimateSensor::new(MockClimateBehavior::ok(40.0, 20.0));

        assert!(scheduler.maybe_run(MonotonicMillis(9_999), &mut sensor).is_none());
        assert_eq!(sensor.reads(), 0);
    }

    #[test]
    fn fires_at_interval_and_restarts_from_fire_time() {
        let mut scheduler = scheduler_at(0);
        let mut sensor = MockClimateSensor::new(MockClimateBehavior::ok(40.0, 20.0));

        assert!(scheduler.maybe_run(MonotonicMillis(10_300), &mut sensor).is_some());
        assert!(scheduler.maybe_run(MonotonicMillis(20_000), &mut sensor).is_none());
        assert!(scheduler.maybe_run(MonotonicMillis(20_300), &mut sensor).is_some());
    }

    #[test]
    fn large_jump_fires_exactly_once() {
        let mut scheduler = scheduler_at(0);
        let mut sensor = MockClimateSensor::new(MockClimateBehavior::ok(40.0, 20.0));

        assert!(scheduler.maybe_run(MonotonicMillis(95_000), &mut sensor).is_some());
        assert!(scheduler.maybe_run(MonotonicMillis(95_000), &mut sensor).is_none());
        assert!(scheduler.maybe_run(MonotonicMillis(95_900), &mut sensor).is_none());
    }

    #[test]
    fn interval_is_measured_across_counter_wrap() {
        let mut scheduler = scheduler_at(u32::MAX - 4_000);
        let mut sensor = MockClimateSensor::new(MockClimateBehavior::ok(40.0, 20.0));

        assert!(scheduler.maybe_run(MonotonicMillis(5_000), &mut sensor).is_none());
        assert!(scheduler.maybe_run(MonotonicMillis(6_000), &mut sensor).is_some());
    }

    #[test]
    fn failed_humidity_still_yields_both_payloads() {
        let mut scheduler = scheduler_at(0);
        let mut sensor = MockClimateSensor::new(MockClimateBehavior::fail_humidity(21.5));

        let batch = scheduler
            .maybe_run(MonotonicMillis(10_000), &mut sensor)
            .expect("scheduler should fire");

        assert_eq!(batch.humidity_payload(), UNAVAILABLE_PAYLOAD);
        assert_eq!(batch.temperature_payload(), "21.50");
    }

    #[test]
    fn nan_reading_is_unavailable() {
        let mut scheduler = scheduler_at(0);
        let mut sensor = MockClimateSensor::new(MockClimateBehavior::ok(f32::NAN, 19.0));

        let batch = scheduler
            .maybe_run(MonotonicMillis(10_000), &mut sensor)
            .expect("scheduler should fire");

        assert!(batch.humidity.is_err());
        assert_eq!(batch.humidity_payload(), UNAVAILABLE_PAYLOAD);
    }

    #[test]
    fn payloads_use_fixed_width() {
        assert_eq!(format_reading(&Ok(5.0)), " 5.00");
        assert_eq!(format_reading(&Ok(-3.456)), "-3.46");
        assert_eq!(format_reading(&Ok(101.234)), "101.23");
    }
}
