use crate::constants::{DEFAULT_ADDRESS, FIRMWARE_VERSION_REQUIRED};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-board settings for a [`BrickPi3`](crate::BrickPi3) handle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BrickPiConfig {
    /// SPI address, 1 to 255. Boards ship with address 1; stacked boards are
    /// given distinct addresses with [`set_address`](crate::set_address).
    pub address: u8,
    /// Prefix the firmware version string must start with for `detect`.
    pub firmware_prefix: String,
}

impl Default for BrickPiConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            firmware_prefix: FIRMWARE_VERSION_REQUIRED.to_string(),
        }
    }
}

impl BrickPiConfig {
    pub fn with_address(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }
}
