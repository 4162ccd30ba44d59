use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("adc error: {0}")]
    Adc(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("invalid adc channel: {0}")]
    InvalidAdcChannel(u8),
    #[error("state lock poisoned")]
    StateLock,
}
