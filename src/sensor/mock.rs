use crate::door::{DoorState, RawSample};
use crate::error::AppError;
use crate::sensor::{AnalogSensor, ClimateSensor, IndicatorSink};
use std::collections::VecDeque;

/// Replays a fixed list of samples, then repeats the last one.
#[derive(Debug, Clone, Default)]
pub struct MockAnalogSensor {
    samples: VecDeque<Option<RawSample>>,
    last: Option<RawSample>,
}

impl MockAnalogSensor {
    pub fn with_samples(samples: impl IntoIterator<Item = RawSample>) -> Self {
        Self {
            samples: samples.into_iter().map(Some).collect(),
            last: None,
        }
    }

    pub fn push(&mut self, raw: RawSample) {
        self.samples.push_back(Some(raw));
    }

    /// Queue a failed read.
    pub fn push_failure(&mut self) {
        self.samples.push_back(None);
    }
}

impl AnalogSensor for MockAnalogSensor {
    fn read_raw(&mut self) -> Result<RawSample, AppError> {
        match self.samples.pop_front() {
            Some(Some(raw)) => {
                self.last = Some(raw);
                Ok(raw)
            }
            Some(None) => Err(AppError::Adc("mock read failed".to_string())),
            None => self
                .last
                .ok_or_else(|| AppError::Adc("mock has no samples".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MockClimateBehavior {
    pub humidity: Option<f32>,
    pub temperature: Option<f32>,
}

impl MockClimateBehavior {
    pub fn ok(humidity: f32, temperature: f32) -> Self {
        Self {
            humidity: Some(humidity),
            temperature: Some(temperature),
        }
    }

    pub fn fail_humidity(temperature: f32) -> Self {
        Self {
            humidity: None,
            temperature: Some(temperature),
        }
    }

    pub fn fail_all() -> Self {
        Self {
            humidity: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockClimateSensor {
    behavior: MockClimateBehavior,
    reads: usize,
}

impl MockClimateSensor {
    pub fn new(behavior: MockClimateBehavior) -> Self {
        Self { behavior, reads: 0 }
    }

    pub fn set_behavior(&mut self, behavior: MockClimateBehavior) {
        self.behavior = behavior;
    }

    /// Number of individual quantity reads performed.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl ClimateSensor for MockClimateSensor {
    fn read_humidity(&mut self) -> Result<f32, AppError> {
        self.reads += 1;
        self.behavior
            .humidity
            .ok_or_else(|| AppError::Sensor("mock humidity read failed".to_string()))
    }

    fn read_temperature(&mut self) -> Result<f32, AppError> {
        self.reads += 1;
        self.behavior
            .temperature
            .ok_or_else(|| AppError::Sensor("mock temperature read failed".to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockIndicators {
    shown: Vec<DoorState>,
    fail: bool,
}

impl MockIndicators {
    pub fn failing() -> Self {
        Self {
            shown: Vec::new(),
            fail: true,
        }
    }

    pub fn shown(&self) -> &[DoorState] {
        &self.shown
    }

    pub fn lit(&self) -> Option<DoorState> {
        self.shown.last().copied()
    }
}

impl IndicatorSink for MockIndicators {
    fn show(&mut self, state: DoorState) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Gpio("mock indicator failed".to_string()));
        }
        self.shown.push(state);
        Ok(())
    }
}
