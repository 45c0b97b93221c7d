use crate::port::{MotorPort, SensorPort};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;

/// SPI message type, the second byte of every outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    None = 0,

    GetManufacturer = 1,
    GetName = 2,
    GetHardwareVersion = 3,
    GetFirmwareVersion = 4,
    GetId = 5,
    SetLed = 6,
    GetVoltage3v3 = 7,
    GetVoltage5v = 8,
    GetVoltage9v = 9,
    GetVoltageVcc = 10,
    SetAddress = 11,

    SetSensorType = 12,

    GetSensor1 = 13,
    GetSensor2 = 14,
    GetSensor3 = 15,
    GetSensor4 = 16,

    I2cTransact1 = 17,
    I2cTransact2 = 18,
    I2cTransact3 = 19,
    I2cTransact4 = 20,

    SetMotorPower = 21,
    SetMotorPosition = 22,
    SetMotorPositionKp = 23,
    SetMotorPositionKd = 24,
    SetMotorDps = 25,
    SetMotorDpsKp = 26,
    SetMotorDpsKd = 27,
    SetMotorLimits = 28,
    OffsetMotorEncoder = 29,

    GetMotorAEncoder = 30,
    GetMotorBEncoder = 31,
    GetMotorCEncoder = 32,
    GetMotorDEncoder = 33,

    GetMotorAStatus = 34,
    GetMotorBStatus = 35,
    GetMotorCStatus = 36,
    GetMotorDStatus = 37,
}

impl MessageType {
    pub fn get_sensor(port: SensorPort) -> Self {
        match port {
            SensorPort::Port1 => MessageType::GetSensor1,
            SensorPort::Port2 => MessageType::GetSensor2,
            SensorPort::Port3 => MessageType::GetSensor3,
            SensorPort::Port4 => MessageType::GetSensor4,
        }
    }

    pub fn i2c_transact(port: SensorPort) -> Self {
        match port {
            SensorPort::Port1 => MessageType::I2cTransact1,
            SensorPort::Port2 => MessageType::I2cTransact2,
            SensorPort::Port3 => MessageType::I2cTransact3,
            SensorPort::Port4 => MessageType::I2cTransact4,
        }
    }

    pub fn get_motor_encoder(port: MotorPort) -> Self {
        match port {
            MotorPort::A => MessageType::GetMotorAEncoder,
            MotorPort::B => MessageType::GetMotorBEncoder,
            MotorPort::C => MessageType::GetMotorCEncoder,
            MotorPort::D => MessageType::GetMotorDEncoder,
        }
    }

    pub fn get_motor_status(port: MotorPort) -> Self {
        match port {
            MotorPort::A => MessageType::GetMotorAStatus,
            MotorPort::B => MessageType::GetMotorBStatus,
            MotorPort::C => MessageType::GetMotorCStatus,
            MotorPort::D => MessageType::GetMotorDStatus,
        }
    }

    /// Fixed frame length of this message, or `None` when the length depends
    /// on runtime state (sensor configuration, sensor reads, I2C transactions).
    pub fn frame_len(self) -> Option<usize> {
        use MessageType::*;
        let len = match self {
            GetManufacturer | GetName => 4 + crate::constants::STRING_LENGTH,
            GetHardwareVersion | GetFirmwareVersion => 8,
            GetId => 4 + crate::constants::ID_LENGTH,
            SetLed => 3,
            GetVoltage3v3 | GetVoltage5v | GetVoltage9v | GetVoltageVcc => 6,
            SetAddress => 3 + crate::constants::ID_LENGTH,
            SetMotorPower | SetMotorPositionKp | SetMotorPositionKd | SetMotorDpsKp | SetMotorDpsKd => 4,
            SetMotorPosition | OffsetMotorEncoder => 7,
            SetMotorDps => 5,
            SetMotorLimits => 6,
            GetMotorAEncoder | GetMotorBEncoder | GetMotorCEncoder | GetMotorDEncoder => 8,
            GetMotorAStatus | GetMotorBStatus | GetMotorCStatus | GetMotorDStatus => 12,
            None | SetSensorType | GetSensor1 | GetSensor2 | GetSensor3 | GetSensor4 | I2cTransact1
            | I2cTransact2 | I2cTransact3 | I2cTransact4 => return Option::None,
        };
        Some(len)
    }
}
