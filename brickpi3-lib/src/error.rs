use crate::info::Version;
use crate::message::MessageType;
use crate::sensor::SensorState;
use std::io;
use thiserror::Error;

/// The primary error type for the `brickpi3` library.
#[derive(Error, Debug)]
pub enum BrickPiError {
    #[error("SPI transport error: {0}")]
    Transport(#[from] io::Error),

    /// The sentinel byte was missing. The board had no reply ready for this
    /// exchange; polling again is expected to succeed.
    #[error("Response not ready (missing 0xA5 sentinel)")]
    ResponseNotReady,

    #[error("Transport returned {actual} bytes, expected {expected}")]
    ResponseLength { expected: usize, actual: usize },

    #[error("Wrong manufacturer: {0:?}. Is a BrickPi3 connected at this address?")]
    WrongManufacturer(String),

    #[error("Wrong device: {0:?} is not a BrickPi3")]
    WrongDevice(String),

    #[error("BrickPi3 firmware needs to be version {required}x but is currently version {actual}")]
    FirmwareMismatch { required: String, actual: String },

    #[error("Sensor type mismatch: configured {expected}, board reports {actual}")]
    SensorTypeMismatch { expected: u8, actual: u8 },

    /// Literal non-valid sensor status reported by the board.
    #[error("Sensor state: {0}")]
    SensorState(SensorState),

    #[error("Invalid port mask {0:#04x}")]
    InvalidPort(u8),

    #[error("Invalid address {0}. Must be in the range of 1 to 255")]
    InvalidAddress(u8),

    #[error("Invalid serial number id {0:?}. Must be empty or a 32-digit hex string")]
    InvalidId(String),

    #[error("I2C sensor type requires an I2C configuration")]
    MissingI2cConfig,

    /// The message has no fixed frame length and cannot be read as a scalar.
    #[error("Message {0} has no fixed frame length")]
    UnsizedMessage(MessageType),

    #[error("Version {0} does not fit the packed u32 encoding")]
    VersionOverflow(Version),
}

impl BrickPiError {
    /// True for conditions that usually clear up by polling again: a reply
    /// that was not ready yet, or a sensor that is still configuring.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrickPiError::ResponseNotReady
                | BrickPiError::SensorState(SensorState::Configuring)
                | BrickPiError::SensorState(SensorState::NoData)
        )
    }
}
