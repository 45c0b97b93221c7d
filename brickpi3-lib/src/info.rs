use crate::error::BrickPiError;
use crate::message::MessageType;
use std::fmt;
use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A hardware or firmware version, packed on the wire as a single u32
/// `major * 1_000_000 + minor * 1_000 + patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl From<u32> for Version {
    fn from(raw: u32) -> Self {
        Self {
            major: raw / 1_000_000,
            minor: (raw / 1_000) % 1_000,
            patch: raw % 1_000,
        }
    }
}

impl TryFrom<Version> for u32 {
    type Error = BrickPiError;

    fn try_from(v: Version) -> Result<Self, Self::Error> {
        v.major
            .checked_mul(1_000_000)
            .and_then(|n| n.checked_add(v.minor.checked_mul(1_000)?))
            .and_then(|n| n.checked_add(v.patch))
            .ok_or(BrickPiError::VersionOverflow(v))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The four power rails the board can measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VoltageRail {
    #[strum(to_string = "3.3V")]
    V3_3,
    #[strum(to_string = "5V")]
    V5,
    #[strum(to_string = "9V")]
    V9,
    #[strum(to_string = "Battery")]
    Battery,
}

impl VoltageRail {
    pub const ALL: [VoltageRail; 4] = [Self::V3_3, Self::V5, Self::V9, Self::Battery];

    pub fn message_type(self) -> MessageType {
        match self {
            VoltageRail::V3_3 => MessageType::GetVoltage3v3,
            VoltageRail::V5 => MessageType::GetVoltage5v,
            VoltageRail::V9 => MessageType::GetVoltage9v,
            VoltageRail::Battery => MessageType::GetVoltageVcc,
        }
    }
}

/// Convert a rail reading in millivolts to volts.
pub fn millivolts_to_volts(mv: u16) -> f32 {
    mv as f32 / 1000.0
}

/// Snapshot of all four rails, in volts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Voltages {
    pub v3_3: f32,
    pub v5: f32,
    pub v9: f32,
    pub battery: f32,
}

impl fmt::Display for Voltages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Battery: {:.3} V, 9V: {:.3} V, 5V: {:.3} V, 3.3V: {:.3} V",
            self.battery, self.v9, self.v5, self.v3_3
        )
    }
}

/// Identity strings and versions read from a board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardInfo {
    pub manufacturer: String,
    pub board: String,
    pub hardware_version: Version,
    pub firmware_version: Version,
    /// 32 upper-case hex digits
    pub id: String,
}

impl fmt::Display for BoardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Manufacturer    : {}", self.manufacturer)?;
        writeln!(f, "Board           : {}", self.board)?;
        writeln!(f, "Serial Number   : {}", self.id)?;
        writeln!(f, "Hardware version: {}", self.hardware_version)?;
        write!(f, "Firmware version: {}", self.firmware_version)
    }
}

/// Decode a NUL-padded string field.
pub(crate) fn decode_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
