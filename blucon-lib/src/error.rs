use std::io;
use thiserror::Error;

/// The primary error type for the `blucon` library.
#[derive(Error, Debug)]
pub enum BluconError {
    #[error("no BluCon patch reader found. Is the transmitter in range?")]
    DeviceNotFound,

    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timeout during BLE operation: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("malformed hex: {0}")]
    MalformedHex(String),

    #[error("insufficient data: expected at least {expected} hex chars, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("peripheral is missing the BluCon write or notify characteristic")]
    MissingCharacteristic,
}
