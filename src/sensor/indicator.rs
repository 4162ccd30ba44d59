use crate::door::DoorState;
use crate::error::AppError;
use crate::sensor::IndicatorSink;
use rppal::gpio::{Gpio, OutputPin};

/// Green LED for an open door, red LED for a closed one.
pub struct GpioIndicators {
    open_led: OutputPin,
    closed_led: OutputPin,
}

impl GpioIndicators {
    /// Claim both BCM pins as outputs, initially dark.
    pub fn new(open_pin: u8, closed_pin: u8) -> Result<Self, AppError> {
        let gpio = Gpio::new().map_err(|err| AppError::Gpio(err.to_string()))?;
        let open_led = gpio
            .get(open_pin)
            .map_err(|err| AppError::Gpio(format!("pin {open_pin}: {err}")))?
            .into_output_low();
        let closed_led = gpio
            .get(closed_pin)
            .map_err(|err| AppError::Gpio(format!("pin {closed_pin}: {err}")))?
            .into_output_low();
        Ok(Self {
            open_led,
            closed_led,
        })
    }
}

impl IndicatorSink for GpioIndicators {
    fn show(&mut self, state: DoorState) -> Result<(), AppError> {
        match state {
            DoorState::Open => {
                self.closed_led.set_low();
                self.open_led.set_high();
            }
            DoorState::Closed => {
                self.open_led.set_low();
                self.closed_led.set_high();
            }
        }
        Ok(())
    }
}
