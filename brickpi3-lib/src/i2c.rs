use crate::constants::LONGEST_I2C_TRANSFER;
use crate::device::BrickPi3;
use crate::error::BrickPiError;
use crate::message::MessageType;
use crate::port::SensorPort;
use crate::transport::Transport;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One I2C write-then-read relayed through a sensor port.
///
/// Read and write lengths above `LONGEST_I2C_TRANSFER` are truncated, not
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I2cTransaction {
    /// Target address, bits 1-7 (not 0-6)
    pub address: u8,
    pub write: Vec<u8>,
    pub read_len: usize,
}

impl I2cTransaction {
    pub fn new(address: u8, write: impl Into<Vec<u8>>, read_len: usize) -> Self {
        Self {
            address,
            write: write.into(),
            read_len,
        }
    }

    pub fn capped_read_len(&self) -> u8 {
        self.read_len.min(LONGEST_I2C_TRANSFER) as u8
    }

    pub fn capped_write(&self) -> &[u8] {
        &self.write[..self.write.len().min(LONGEST_I2C_TRANSFER)]
    }
}

/// Extra settings sent when a port is configured as an I2C sensor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I2cConfig {
    /// Target bus speed, in microseconds per bit
    pub speed: u8,
    /// Delay between repeated transactions, in microseconds
    pub delay_us: u32,
    /// Transaction the board repeats while the I2C repeat flag is set
    pub transaction: I2cTransaction,
}

impl<T: Transport> BrickPi3<T> {
    /// Run one I2C transaction on `port`. The bytes read are returned by the
    /// next [`get_sensor`](BrickPi3::get_sensor) on that port.
    pub fn transact_i2c(&mut self, port: SensorPort, transaction: &I2cTransaction) -> Result<(), BrickPiError> {
        let read_len = transaction.capped_read_len();
        let write = transaction.capped_write();
        self.i2c_read_lengths[port.index()] = read_len;

        debug!(
            "I2C transact on {}: address {:#04x}, write {} bytes, read {} bytes",
            port,
            transaction.address,
            write.len(),
            read_len
        );
        let frame = self
            .frame(MessageType::i2c_transact(port))
            .with_u8(transaction.address)
            .with_u8(read_len)
            .with_u8(write.len() as u8)
            .with_slice(write);
        self.write(frame)
    }

    /// Bytes the next I2C sensor read on `port` is expected to return.
    pub fn i2c_read_length(&self, port: SensorPort) -> usize {
        self.i2c_read_lengths[port.index()] as usize
    }
}
