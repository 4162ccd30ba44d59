use serde::{Deserialize, Serialize};
use std::fmt;

pub mod model;
pub mod tracker;

pub use model::{Calibration, Classification, DistanceModel};
pub use tracker::{EdgeEvent, StateTracker};

/// One ADC sample in the sensor's resolution range.
pub type RawSample = u16;

pub const DEFAULT_MAX_RAW: RawSample = 1023;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    /// Payload published on the door topic when the door enters this state.
    pub fn transition_payload(self) -> &'static str {
        match self {
            DoorState::Open => "garage_opened",
            DoorState::Closed => "garage_closed",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorState::Open => write!(f, "open"),
            DoorState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// Rounded centimeter estimate.
    Centimeters(f64),
    /// The sample could not be mapped through the calibration curve.
    OutOfRange,
}

impl Distance {
    pub fn centimeters(self) -> Option<f64> {
        match self {
            Distance::Centimeters(cm) => Some(cm),
            Distance::OutOfRange => None,
        }
    }

    pub fn is_out_of_range(self) -> bool {
        matches!(self, Distance::OutOfRange)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Centimeters(cm) => write!(f, "{cm}cm"),
            Distance::OutOfRange => write!(f, "out of range"),
        }
    }
}
