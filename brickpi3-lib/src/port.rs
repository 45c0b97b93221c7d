use crate::constants::PORT_COUNT;
use crate::error::BrickPiError;
use std::ops::BitOr;
use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single sensor port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorPort {
    #[strum(to_string = "PORT_1")]
    Port1,
    #[strum(to_string = "PORT_2")]
    Port2,
    #[strum(to_string = "PORT_3")]
    Port3,
    #[strum(to_string = "PORT_4")]
    Port4,
}

/// A single motor port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotorPort {
    #[strum(to_string = "PORT_A")]
    A,
    #[strum(to_string = "PORT_B")]
    B,
    #[strum(to_string = "PORT_C")]
    C,
    #[strum(to_string = "PORT_D")]
    D,
}

impl SensorPort {
    pub const ALL: [SensorPort; PORT_COUNT] = [Self::Port1, Self::Port2, Self::Port3, Self::Port4];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn mask(self) -> u8 {
        1 << self.index()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl MotorPort {
    pub const ALL: [MotorPort; PORT_COUNT] = [Self::A, Self::B, Self::C, Self::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn mask(self) -> u8 {
        1 << self.index()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Bitmask selecting one or more ports, as sent on the wire.
///
/// Only the low four bits are meaningful and at least one must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortMask(u8);

impl PortMask {
    pub const PORT_1: PortMask = PortMask(0x01);
    pub const PORT_2: PortMask = PortMask(0x02);
    pub const PORT_3: PortMask = PortMask(0x04);
    pub const PORT_4: PortMask = PortMask(0x08);

    pub const PORT_A: PortMask = PortMask(0x01);
    pub const PORT_B: PortMask = PortMask(0x02);
    pub const PORT_C: PortMask = PortMask(0x04);
    pub const PORT_D: PortMask = PortMask(0x08);

    pub const ALL: PortMask = PortMask(0x0F);

    pub fn new(bits: u8) -> Result<Self, BrickPiError> {
        if bits == 0 || bits & !Self::ALL.0 != 0 {
            return Err(BrickPiError::InvalidPort(bits));
        }
        Ok(PortMask(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains_index(self, index: usize) -> bool {
        index < PORT_COUNT && self.0 & (1 << index) != 0
    }

    /// Port indices selected by this mask, lowest first.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..PORT_COUNT).filter(move |&i| self.contains_index(i))
    }

    pub fn sensor_ports(self) -> impl Iterator<Item = SensorPort> {
        self.indices().filter_map(SensorPort::from_index)
    }

    pub fn motor_ports(self) -> impl Iterator<Item = MotorPort> {
        self.indices().filter_map(MotorPort::from_index)
    }
}

impl From<SensorPort> for PortMask {
    fn from(port: SensorPort) -> Self {
        PortMask(port.mask())
    }
}

impl From<MotorPort> for PortMask {
    fn from(port: MotorPort) -> Self {
        PortMask(port.mask())
    }
}

impl TryFrom<u8> for PortMask {
    type Error = BrickPiError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        PortMask::new(bits)
    }
}

impl BitOr for PortMask {
    type Output = PortMask;

    fn bitor(self, rhs: PortMask) -> PortMask {
        PortMask(self.0 | rhs.0)
    }
}

impl BitOr for SensorPort {
    type Output = PortMask;

    fn bitor(self, rhs: SensorPort) -> PortMask {
        PortMask(self.mask() | rhs.mask())
    }
}

impl BitOr for MotorPort {
    type Output = PortMask;

    fn bitor(self, rhs: MotorPort) -> PortMask {
        PortMask(self.mask() | rhs.mask())
    }
}

impl BitOr<SensorPort> for PortMask {
    type Output = PortMask;

    fn bitor(self, rhs: SensorPort) -> PortMask {
        PortMask(self.0 | rhs.mask())
    }
}

impl BitOr<MotorPort> for PortMask {
    type Output = PortMask;

    fn bitor(self, rhs: MotorPort) -> PortMask {
        PortMask(self.0 | rhs.mask())
    }
}
