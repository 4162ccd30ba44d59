//! MCP3008 10-bit SPI ADC carrying the infrared distance sensor output.

use crate::door::RawSample;
use crate::error::AppError;

#[cfg(target_os = "linux")]
use crate::sensor::AnalogSensor;
#[cfg(target_os = "linux")]
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

pub const CHANNEL_COUNT: u8 = 8;
pub const CLOCK_SPEED_HZ: u32 = 1_350_000;

/// Single-ended conversion request for `channel`: start bit, then SGL/DIFF + D2..D0.
pub fn request_frame(channel: u8) -> Result<[u8; 3], AppError> {
    if channel >= CHANNEL_COUNT {
        return Err(AppError::InvalidAdcChannel(channel));
    }
    Ok([0x01, (0x08 | channel) << 4, 0x00])
}

/// Extract the 10-bit conversion result from a response frame.
pub fn decode_frame(frame: [u8; 3]) -> RawSample {
    (RawSample::from(frame[1] & 0x03) << 8) | RawSample::from(frame[2])
}

#[cfg(target_os = "linux")]
pub struct Mcp3008 {
    spi: Spi,
    request: [u8; 3],
}

#[cfg(target_os = "linux")]
impl Mcp3008 {
    pub fn new(bus: u8, slave_select: u8, channel: u8) -> Result<Self, AppError> {
        let request = request_frame(channel)?;
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => return Err(AppError::Spi(format!("unsupported SPI bus {other}"))),
        };
        let slave_select = match slave_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => return Err(AppError::Spi(format!("unsupported slave select {other}"))),
        };
        let spi = Spi::new(bus, slave_select, CLOCK_SPEED_HZ, Mode::Mode0)
            .map_err(|err| AppError::Spi(err.to_string()))?;
        Ok(Self { spi, request })
    }
}

#[cfg(target_os = "linux")]
impl AnalogSensor for Mcp3008 {
    fn read_raw(&mut self) -> Result<RawSample, AppError> {
        let mut response = [0u8; 3];
        self.spi
            .transfer(&mut response, &self.request)
            .map_err(|err| AppError::Spi(err.to_string()))?;
        Ok(decode_frame(response))
    }
}
