//! Distance model for the analog infrared ranging sensor.
//!
//! Maps a raw ADC sample through the sensor's power-law calibration curve
//! `round(coefficient * raw^exponent - offset)` and classifies the result
//! against the door-open threshold.

use crate::door::{DEFAULT_MAX_RAW, Distance, DoorState, RawSample};
use serde::Deserialize;

pub const DEFAULT_THRESHOLD_CM: f64 = 20.0;

/// Sensor-specific calibration constants, loaded from `[door.calibration]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Calibration {
    pub coefficient: f64,
    pub exponent: f64,
    pub offset: f64,
    /// Highest sample the ADC can legitimately report.
    #[serde(default = "default_max_raw")]
    pub max_raw: RawSample,
}

fn default_max_raw() -> RawSample {
    DEFAULT_MAX_RAW
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            coefficient: 10650.08,
            exponent: -0.935,
            offset: 10.0,
            max_raw: DEFAULT_MAX_RAW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub distance: Distance,
    pub state: DoorState,
}

/// Stateless sample classifier.
///
/// With `hysteresis_cm == 0` a single threshold decides the state and the
/// result does not depend on the previous state. A positive band keeps an
/// open door open until the distance drops below `threshold_cm - hysteresis_cm`.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    calibration: Calibration,
    threshold_cm: f64,
    hysteresis_cm: f64,
}

impl DistanceModel {
    pub fn new(calibration: Calibration, threshold_cm: f64, hysteresis_cm: f64) -> Self {
        Self {
            calibration,
            threshold_cm,
            hysteresis_cm: hysteresis_cm.max(0.0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Calibration::default(), DEFAULT_THRESHOLD_CM, 0.0)
    }

    pub fn threshold_cm(&self) -> f64 {
        self.threshold_cm
    }

    pub fn distance(&self, raw: RawSample) -> Distance {
        // raw^negative-exponent is infinite at zero.
        if raw == 0 || raw > self.calibration.max_raw {
            return Distance::OutOfRange;
        }
        let Calibration {
            coefficient,
            exponent,
            offset,
            ..
        } = self.calibration;
        let cm = (coefficient * f64::from(raw).powf(exponent) - offset).round();
        if cm.is_finite() {
            Distance::Centimeters(cm)
        } else {
            Distance::OutOfRange
        }
    }

    pub fn classify(&self, raw: RawSample, previous: Option<DoorState>) -> Classification {
        let distance = self.distance(raw);
        let state = match distance {
            Distance::OutOfRange => DoorState::Closed,
            Distance::Centimeters(cm) => self.state_for(cm, previous),
        };
        Classification { distance, state }
    }

    fn state_for(&self, cm: f64, previous: Option<DoorState>) -> DoorState {
        if cm >= self.threshold_cm {
            return DoorState::Open;
        }
        let holding_open = previous == Some(DoorState::Open)
            && self.hysteresis_cm > 0.0
            && cm >= self.threshold_cm - self.hysteresis_cm;
        if holding_open {
            DoorState::Open
        } else {
            DoorState::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_calibration_maps_samples_to_rounded_centimeters() {
        let model = DistanceModel::with_defaults();

        assert_eq!(model.distance(500), Distance::Centimeters(22.0));
        assert_eq!(model.distance(600), Distance::Centimeters(17.0));
        assert_eq!(model.distance(100), Distance::Centimeters(134.0));
        assert_eq!(model.distance(1023), Distance::Centimeters(6.0));
    }

    #[test]
    fn classification_is_deterministic() {
        let model = DistanceModel::with_defaults();

        for raw in [1, 250, 499, 500, 501, 1023] {
            assert_eq!(model.classify(raw, None), model.classify(raw, None));
        }
    }

    #[test]
    fn threshold_is_inclusive_for_open() {
        let model = DistanceModel::with_defaults();

        assert_eq!(model.classify(500, None).state, DoorState::Open);
        assert_eq!(model.classify(600, None).state, DoorState::Closed);
    }

    #[test]
    fn zero_sample_is_closed_and_out_of_range() {
        let model = DistanceModel::with_defaults();

        let classification = model.classify(0, Some(DoorState::Open));

        assert_eq!(classification.state, DoorState::Closed);
        assert!(classification.distance.is_out_of_range());
    }

    #[test]
    fn sample_above_adc_range_is_out_of_range() {
        let model = DistanceModel::with_defaults();

        let classification = model.classify(4096, None);

        assert_eq!(classification.distance, Distance::OutOfRange);
        assert_eq!(classification.state, DoorState::Closed);
    }

    #[test]
    fn single_threshold_ignores_previous_state() {
        let model = DistanceModel::with_defaults();

        // 17cm is below the threshold whatever the door was doing before.
        assert_eq!(
            model.classify(600, Some(DoorState::Open)).state,
            DoorState::Closed
        );
    }

    #[test]
    fn hysteresis_band_holds_open_door_open() {
        let model = DistanceModel::new(Calibration::default(), DEFAULT_THRESHOLD_CM, 5.0);

        // 17cm sits inside [15, 20).
        assert_eq!(
            model.classify(600, Some(DoorState::Open)).state,
            DoorState::Open
        );
        assert_eq!(
            model.classify(600, Some(DoorState::Closed)).state,
            DoorState::Closed
        );
        assert_eq!(model.classify(600, None).state, DoorState::Closed);
        // 6cm is below the band.
        assert_eq!(
            model.classify(1023, Some(DoorState::Open)).state,
            DoorState::Closed
        );
    }

    #[test]
    fn negative_hysteresis_is_treated_as_legacy_mode() {
        let model = DistanceModel::new(Calibration::default(), DEFAULT_THRESHOLD_CM, -3.0);

        assert_eq!(
            model.classify(600, Some(DoorState::Open)).state,
            DoorState::Closed
        );
    }
}
