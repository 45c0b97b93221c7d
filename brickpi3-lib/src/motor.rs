use crate::device::BrickPi3;
use crate::error::BrickPiError;
use crate::message::MessageType;
use crate::port::{MotorPort, PortMask};
use crate::transport::Transport;
use modular_bitfield::prelude::*;
use std::fmt;
use tracing::debug;
use zerocopy::byteorder::big_endian::{I16, I32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorStatusFlags {
    /// Motors were disabled because the battery voltage is too low
    pub low_voltage_float: bool,
    #[skip]
    unused: B7,
}

/// Motor status payload as it appears on the wire.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct MotorStatusRaw {
    pub flags: u8,
    pub power: i8,
    pub position: I32,
    pub dps: I16,
}

const MOTOR_STATUS_SIZE: usize = std::mem::size_of::<MotorStatusRaw>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorStatus {
    pub flags: MotorStatusFlags,
    /// Applied PWM power, -100 to 100, or -128 when floating
    pub power: i8,
    /// Encoder position in degrees, relative to the current offset
    pub position: i32,
    /// Speed in degrees per second
    pub dps: i16,
}

impl From<MotorStatusRaw> for MotorStatus {
    fn from(raw: MotorStatusRaw) -> Self {
        Self {
            flags: MotorStatusFlags::from_bytes([raw.flags]),
            power: raw.power,
            position: raw.position.get(),
            dps: raw.dps.get(),
        }
    }
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state: {:02X} power: {:4} position: {:6} dps: {:5}",
            self.flags.into_bytes()[0],
            self.power,
            self.position,
            self.dps
        )
    }
}

impl<T: Transport> BrickPi3<T> {
    /// Set the PWM power, -100 to 100, or `MOTOR_FLOAT` to let the motor float.
    pub fn set_motor_power(&mut self, ports: impl Into<PortMask>, power: i8) -> Result<(), BrickPiError> {
        let frame = self
            .frame(MessageType::SetMotorPower)
            .with_u8(ports.into().bits())
            .with_i8(power);
        self.write(frame)
    }

    /// Run to an absolute encoder position, in degrees.
    pub fn set_motor_position(&mut self, ports: impl Into<PortMask>, position: i32) -> Result<(), BrickPiError> {
        let frame = self
            .frame(MessageType::SetMotorPosition)
            .with_u8(ports.into().bits())
            .with_i32(position);
        self.write(frame)
    }

    /// Run each motor in `ports` to its current position plus `delta`.
    ///
    /// Each port is read and commanded separately, so this is not atomic
    /// across ports. Stops at the first failure.
    pub fn set_motor_position_relative(&mut self, ports: impl Into<PortMask>, delta: i32) -> Result<(), BrickPiError> {
        for port in ports.into().motor_ports() {
            let encoder = self.get_motor_encoder(port)?;
            self.set_motor_position(port, encoder.wrapping_add(delta))?;
        }
        Ok(())
    }

    pub fn set_motor_position_kp(&mut self, ports: impl Into<PortMask>, kp: u8) -> Result<(), BrickPiError> {
        self.write_gain(MessageType::SetMotorPositionKp, ports.into(), kp)
    }

    pub fn set_motor_position_kd(&mut self, ports: impl Into<PortMask>, kd: u8) -> Result<(), BrickPiError> {
        self.write_gain(MessageType::SetMotorPositionKd, ports.into(), kd)
    }

    /// Run at a target speed in degrees per second.
    pub fn set_motor_dps(&mut self, ports: impl Into<PortMask>, dps: i16) -> Result<(), BrickPiError> {
        let frame = self
            .frame(MessageType::SetMotorDps)
            .with_u8(ports.into().bits())
            .with_i16(dps);
        self.write(frame)
    }

    pub fn set_motor_dps_kp(&mut self, ports: impl Into<PortMask>, kp: u8) -> Result<(), BrickPiError> {
        self.write_gain(MessageType::SetMotorDpsKp, ports.into(), kp)
    }

    pub fn set_motor_dps_kd(&mut self, ports: impl Into<PortMask>, kd: u8) -> Result<(), BrickPiError> {
        self.write_gain(MessageType::SetMotorDpsKd, ports.into(), kd)
    }

    fn write_gain(&mut self, message_type: MessageType, ports: PortMask, gain: u8) -> Result<(), BrickPiError> {
        let frame = self.frame(message_type).with_u8(ports.bits()).with_u8(gain);
        self.write(frame)
    }

    /// Limit power (percent, 0 = no limit) in speed and position modes, and
    /// speed (degrees per second, 0 = no limit) in position mode.
    pub fn set_motor_limits(&mut self, ports: impl Into<PortMask>, power: u8, dps: u16) -> Result<(), BrickPiError> {
        let frame = self
            .frame(MessageType::SetMotorLimits)
            .with_u8(ports.into().bits())
            .with_u8(power)
            .with_u16(dps);
        self.write(frame)
    }

    pub fn get_motor_status(&mut self, port: MotorPort) -> Result<MotorStatus, BrickPiError> {
        let payload = self.read_fixed(MessageType::get_motor_status(port))?;
        let raw = MotorStatusRaw::read_from_bytes(&payload[..MOTOR_STATUS_SIZE]).map_err(|_| {
            BrickPiError::ResponseLength {
                expected: MOTOR_STATUS_SIZE,
                actual: payload.len(),
            }
        })?;
        Ok(raw.into())
    }

    /// Shift the encoder by `offset`: subsequent reads are lowered by it.
    /// Offsets accumulate on the board; the raw counter is never reset.
    pub fn offset_motor_encoder(&mut self, ports: impl Into<PortMask>, offset: i32) -> Result<(), BrickPiError> {
        let frame = self
            .frame(MessageType::OffsetMotorEncoder)
            .with_u8(ports.into().bits())
            .with_i32(offset);
        self.write(frame)
    }

    /// Encoder position in degrees.
    pub fn get_motor_encoder(&mut self, port: MotorPort) -> Result<i32, BrickPiError> {
        self.read_u32(MessageType::get_motor_encoder(port)).map(|v| v as i32)
    }

    /// Zero the encoder on `port`, returning the value it had.
    pub fn reset_motor_encoder(&mut self, port: MotorPort) -> Result<i32, BrickPiError> {
        let value = self.get_motor_encoder(port)?;
        debug!("Resetting encoder {} from {}", port, value);
        self.offset_motor_encoder(port, value)?;
        Ok(value)
    }

    /// Zero the encoder of every motor in `ports`. Stops at the first failure.
    pub fn reset_motor_encoders(&mut self, ports: impl Into<PortMask>) -> Result<(), BrickPiError> {
        for port in ports.into().motor_ports() {
            self.reset_motor_encoder(port)?;
        }
        Ok(())
    }

    /// Make the encoder on `port` read `value` at its current position.
    pub fn set_motor_encoder(&mut self, port: MotorPort, value: i32) -> Result<(), BrickPiError> {
        let current = self.get_motor_encoder(port)?;
        self.offset_motor_encoder(port, current.wrapping_sub(value))
    }
}
