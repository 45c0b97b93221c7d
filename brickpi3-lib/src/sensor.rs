//! Sensor configuration and the per-type response decode table.
//!
//! A sensor read returns `[.., 0xA5, echoed_type, state, data...]` where the
//! data layout depends entirely on the type the port was configured as. The
//! host keeps its own record of each port's type so it knows how many bytes
//! to clock in, and checks the echoed type against it before decoding.

use crate::constants::RESPONSE_HEADER_SIZE;
use crate::device::BrickPi3;
use crate::error::BrickPiError;
use crate::i2c::I2cConfig;
use crate::message::MessageType;
use crate::port::{PortMask, SensorPort};
use crate::transport::Transport;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use std::fmt;
use strum_macros::Display;
use tracing::{debug, info, warn};
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bytes preceding sensor data in the payload: echoed type and state.
const SENSOR_PREFIX_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SensorType {
    /// Not configured for any sensor type
    None = 1,
    I2c = 2,
    /// 9v pullup, pin 5 and 6 configuration, and ADC 1 / ADC 6 readback
    Custom = 3,

    /// NXT or EV3 touch sensor, detected automatically
    Touch = 4,
    TouchNxt = 5,
    TouchEv3 = 6,

    NxtLightOn = 7,
    NxtLightOff = 8,

    NxtColorRed = 9,
    NxtColorGreen = 10,
    NxtColorBlue = 11,
    NxtColorFull = 12,
    NxtColorOff = 13,

    NxtUltrasonic = 14,

    Ev3GyroAbs = 15,
    Ev3GyroDps = 16,
    Ev3GyroAbsDps = 17,

    Ev3ColorReflected = 18,
    Ev3ColorAmbient = 19,
    Ev3ColorColor = 20,
    Ev3ColorRawReflected = 21,
    Ev3ColorColorComponents = 22,

    Ev3UltrasonicCm = 23,
    Ev3UltrasonicInches = 24,
    Ev3UltrasonicListen = 25,

    Ev3InfraredProximity = 26,
    Ev3InfraredSeek = 27,
    Ev3InfraredRemote = 28,
}

impl SensorType {
    /// Length of the read exchange for a port of this type, or `None` when the
    /// type cannot be read.
    pub fn response_len(self, i2c_read_len: usize) -> Option<usize> {
        use SensorType::*;
        let len = match self {
            Touch | TouchNxt | TouchEv3 | NxtUltrasonic | Ev3ColorReflected | Ev3ColorAmbient | Ev3ColorColor
            | Ev3UltrasonicListen | Ev3InfraredProximity => 7,
            NxtLightOn | NxtLightOff | NxtColorRed | NxtColorGreen | NxtColorBlue | NxtColorOff | Ev3GyroAbs
            | Ev3GyroDps | Ev3UltrasonicCm | Ev3UltrasonicInches => 8,
            Custom | Ev3ColorRawReflected | Ev3GyroAbsDps | Ev3InfraredRemote => 10,
            NxtColorFull => 12,
            Ev3ColorColorComponents | Ev3InfraredSeek => 14,
            I2c => RESPONSE_HEADER_SIZE + SENSOR_PREFIX_SIZE + i2c_read_len,
            SensorType::None => return Option::None,
        };
        Some(len)
    }

    /// Whether a board echoing `echoed` agrees with the host's record of this
    /// type. A generic touch port may report either touch variant.
    pub fn accepts_echo(self, echoed: u8) -> bool {
        if echoed == u8::from(self) {
            return true;
        }
        self == SensorType::Touch
            && (echoed == u8::from(SensorType::TouchNxt) || echoed == u8::from(SensorType::TouchEv3))
    }
}

/// Sensor status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SensorState {
    ValidData = 0,
    NotConfigured = 1,
    Configuring = 2,
    NoData = 3,
    /// No ACK, SCL stretched too long, etc.
    I2cError = 4,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Flags for configuring custom and I2C sensors.
#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfigFlags {
    /// I2C. Send a clock pulse between reading and writing. Required by the NXT US sensor.
    pub i2c_mid_clock: bool,
    /// I2C or custom. Enable 9v pullup on pin 1.
    pub pin1_pull: bool,
    /// I2C. Keep performing the same transaction, e.g. keep polling a sensor.
    pub i2c_repeat: bool,
    #[skip]
    unused_3: B1,
    pub pin5_dir: bool,
    pub pin5_state: bool,
    #[skip]
    unused_6: B2,
    pub pin6_dir: bool,
    pub pin6_state: bool,
    #[skip]
    unused_10: B2,
    pub report_1_adc: bool,
    #[skip]
    unused_13: B1,
    pub report_6_adc: bool,
    #[skip]
    unused_15: B1,
}

impl From<SensorConfigFlags> for u16 {
    fn from(flags: SensorConfigFlags) -> Self {
        u16::from_le_bytes(flags.into_bytes())
    }
}

impl From<u16> for SensorConfigFlags {
    fn from(value: u16) -> Self {
        SensorConfigFlags::from_bytes(value.to_le_bytes())
    }
}

/// Button bitmask for one EV3 infrared remote channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RemoteButtons(pub u8);

impl RemoteButtons {
    pub const RED_UP: u8 = 0x01;
    pub const RED_DOWN: u8 = 0x02;
    pub const BLUE_UP: u8 = 0x04;
    pub const BLUE_DOWN: u8 = 0x08;
    pub const BROADCAST: u8 = 0x10;

    /// Map the remote's 0..=11 button code to a bitmask. Anything else means
    /// no button.
    pub fn from_code(code: u8) -> Self {
        const R_U: u8 = RemoteButtons::RED_UP;
        const R_D: u8 = RemoteButtons::RED_DOWN;
        const B_U: u8 = RemoteButtons::BLUE_UP;
        const B_D: u8 = RemoteButtons::BLUE_DOWN;
        const TABLE: [u8; 12] = [
            0,
            R_U,
            R_D,
            B_U,
            B_D,
            R_U | B_U,
            R_U | B_D,
            R_D | B_U,
            R_D | B_D,
            RemoteButtons::BROADCAST,
            R_U | R_D,
            B_U | B_D,
        ];
        RemoteButtons(TABLE.get(code as usize).copied().unwrap_or(0))
    }

    pub fn red_up(self) -> bool {
        self.0 & Self::RED_UP != 0
    }

    pub fn red_down(self) -> bool {
        self.0 & Self::RED_DOWN != 0
    }

    pub fn blue_up(self) -> bool {
        self.0 & Self::BLUE_UP != 0
    }

    pub fn blue_down(self) -> bool {
        self.0 & Self::BLUE_DOWN != 0
    }

    pub fn broadcast(self) -> bool {
        self.0 & Self::BROADCAST != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ultrasonic {
    pub cm: f32,
    pub inch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gyro {
    /// Absolute rotation in degrees
    pub abs: i16,
    /// Rotation rate in degrees per second
    pub dps: i16,
}

/// NXT color sensor in full color mode. Light values are 10-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NxtColor {
    pub color: u8,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub ambient: u16,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ColorComponentsRaw {
    pub red: U16,
    pub green: U16,
    pub blue: U16,
    pub fourth: U16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorComponents {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    /// Fourth channel, meaning undocumented (possibly a raw ambient value)
    pub fourth: u16,
}

impl From<ColorComponentsRaw> for ColorComponents {
    fn from(raw: ColorComponentsRaw) -> Self {
        Self {
            red: raw.red.get(),
            green: raw.green.get(),
            blue: raw.blue.get(),
            fourth: raw.fourth.get(),
        }
    }
}

/// EV3 color sensor raw reflected mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawReflected {
    pub reflected: i16,
    /// Second channel, meaning undocumented (possibly a raw ambient value)
    pub second: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeekChannel {
    /// -25 to 25
    pub heading: i8,
    /// -128, or 0 to 100
    pub distance: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CustomReading {
    /// Pin 1 ADC, 0 to 4095 on a 5v scale
    pub adc1: u16,
    /// Pin 6 ADC, 0 to 4095 on a 3.3v scale
    pub adc6: u16,
    pub pin5: bool,
    pub pin6: bool,
}

/// A decoded sensor value. The variant is fixed by the port's configured type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorReading {
    Touch(bool),
    /// NXT light sensor, or one NXT color channel (red, green, blue, off)
    Light(u16),
    /// EV3 color reflected or ambient intensity
    Intensity(u8),
    /// EV3 detected color code
    ColorCode(u8),
    NxtColor(NxtColor),
    ColorComponents(ColorComponents),
    RawReflected(RawReflected),
    GyroAbs(i16),
    GyroDps(i16),
    Gyro(Gyro),
    Ultrasonic(Ultrasonic),
    /// EV3 ultrasonic listen mode: another ultrasonic sensor was heard
    UltrasonicPresence(bool),
    /// EV3 infrared proximity, 0 to 100%
    Proximity(u8),
    InfraredSeek([SeekChannel; 4]),
    InfraredRemote([RemoteButtons; 4]),
    Custom(CustomReading),
    I2c(Vec<u8>),
}

fn be16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// NXT full color packs two extra low bits per channel into a trailing byte.
fn ten_bit(high: u8, trailer: u8, shift: u8) -> u16 {
    ((high as u16) << 2) | ((trailer >> shift) & 0x03) as u16
}

impl SensorReading {
    /// Decode the data bytes following the echoed type and state bytes.
    ///
    /// `data` must hold at least as many bytes as the type's response carries;
    /// `i2c_read_len` is only used for I2C ports.
    pub fn decode(sensor_type: SensorType, data: &[u8], i2c_read_len: usize) -> Result<Self, BrickPiError> {
        use SensorType::*;
        let expected = sensor_type
            .response_len(i2c_read_len)
            .ok_or(BrickPiError::SensorState(SensorState::NotConfigured))?
            - RESPONSE_HEADER_SIZE
            - SENSOR_PREFIX_SIZE;
        if data.len() < expected {
            return Err(BrickPiError::ResponseLength {
                expected,
                actual: data.len(),
            });
        }

        let reading = match sensor_type {
            Touch | TouchNxt | TouchEv3 => SensorReading::Touch(data[0] != 0),
            NxtUltrasonic => SensorReading::Ultrasonic(Ultrasonic {
                cm: data[0] as f32,
                inch: data[0] as f32 / 2.54,
            }),
            Ev3ColorReflected | Ev3ColorAmbient => SensorReading::Intensity(data[0]),
            Ev3ColorColor => SensorReading::ColorCode(data[0]),
            Ev3UltrasonicListen => SensorReading::UltrasonicPresence(data[0] != 0),
            Ev3InfraredProximity => SensorReading::Proximity(data[0]),

            NxtLightOn | NxtLightOff | NxtColorRed | NxtColorGreen | NxtColorBlue | NxtColorOff => {
                SensorReading::Light(be16(data, 0))
            }
            Ev3GyroAbs => SensorReading::GyroAbs(be16(data, 0) as i16),
            Ev3GyroDps => SensorReading::GyroDps(be16(data, 0) as i16),
            Ev3UltrasonicCm => {
                let raw = be16(data, 0) as f32;
                SensorReading::Ultrasonic(Ultrasonic {
                    cm: raw / 10.0,
                    inch: raw / 25.4,
                })
            }
            Ev3UltrasonicInches => {
                let raw = be16(data, 0) as f32;
                SensorReading::Ultrasonic(Ultrasonic {
                    cm: raw * 0.254,
                    inch: raw / 10.0,
                })
            }

            Custom => SensorReading::Custom(CustomReading {
                adc1: (((data[2] & 0x0F) as u16) << 8) | data[3] as u16,
                adc6: ((data[2] >> 4) & 0x0F) as u16 | ((data[1] as u16) << 4),
                pin5: data[0] & 0x01 != 0,
                pin6: (data[0] >> 1) & 0x01 != 0,
            }),
            Ev3ColorRawReflected => SensorReading::RawReflected(RawReflected {
                reflected: be16(data, 0) as i16,
                second: be16(data, 2) as i16,
            }),
            Ev3GyroAbsDps => SensorReading::Gyro(Gyro {
                abs: be16(data, 0) as i16,
                dps: be16(data, 2) as i16,
            }),
            Ev3InfraredRemote => {
                SensorReading::InfraredRemote(std::array::from_fn(|ch| RemoteButtons::from_code(data[ch])))
            }

            NxtColorFull => SensorReading::NxtColor(NxtColor {
                color: data[0],
                red: ten_bit(data[1], data[5], 6),
                green: ten_bit(data[2], data[5], 4),
                blue: ten_bit(data[3], data[5], 2),
                ambient: ten_bit(data[4], data[5], 0),
            }),
            Ev3ColorColorComponents => {
                let raw = ColorComponentsRaw::read_from_bytes(&data[..expected]).map_err(|_| {
                    BrickPiError::ResponseLength {
                        expected,
                        actual: data.len(),
                    }
                })?;
                SensorReading::ColorComponents(raw.into())
            }
            Ev3InfraredSeek => SensorReading::InfraredSeek(std::array::from_fn(|ch| SeekChannel {
                heading: data[ch * 2] as i8,
                distance: data[ch * 2 + 1] as i8,
            })),

            I2c => SensorReading::I2c(data[..expected].to_vec()),
            SensorType::None => return Err(BrickPiError::SensorState(SensorState::NotConfigured)),
        };
        Ok(reading)
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorReading::Touch(pressed) => write!(f, "touch: {}", if *pressed { "pressed" } else { "released" }),
            SensorReading::Light(v) => write!(f, "light: {}", v),
            SensorReading::Intensity(v) => write!(f, "intensity: {}", v),
            SensorReading::ColorCode(c) => write!(f, "color: {}", c),
            SensorReading::NxtColor(c) => write!(
                f,
                "color: {} red: {} green: {} blue: {} ambient: {}",
                c.color, c.red, c.green, c.blue, c.ambient
            ),
            SensorReading::ColorComponents(c) => {
                write!(f, "red: {} green: {} blue: {} ({})", c.red, c.green, c.blue, c.fourth)
            }
            SensorReading::RawReflected(r) => write!(f, "reflected: {} ({})", r.reflected, r.second),
            SensorReading::GyroAbs(abs) => write!(f, "gyro: {} deg", abs),
            SensorReading::GyroDps(dps) => write!(f, "gyro: {} deg/s", dps),
            SensorReading::Gyro(g) => write!(f, "gyro: {} deg, {} deg/s", g.abs, g.dps),
            SensorReading::Ultrasonic(u) => write!(f, "ultrasonic: {:.1} cm, {:.1} in", u.cm, u.inch),
            SensorReading::UltrasonicPresence(p) => write!(f, "ultrasonic presence: {}", p),
            SensorReading::Proximity(p) => write!(f, "proximity: {}%", p),
            SensorReading::InfraredSeek(channels) => {
                write!(f, "seek:")?;
                for (i, ch) in channels.iter().enumerate() {
                    write!(f, " [{}] heading {} distance {}", i + 1, ch.heading, ch.distance)?;
                }
                Ok(())
            }
            SensorReading::InfraredRemote(channels) => {
                write!(f, "remote:")?;
                for (i, ch) in channels.iter().enumerate() {
                    write!(f, " [{}] {:02X}", i + 1, ch.0)?;
                }
                Ok(())
            }
            SensorReading::Custom(c) => write!(
                f,
                "adc1: {} adc6: {} pin5: {} pin6: {}",
                c.adc1, c.adc6, c.pin5 as u8, c.pin6 as u8
            ),
            SensorReading::I2c(bytes) => write!(f, "i2c: {}", hex::encode(bytes)),
        }
    }
}

impl<T: Transport> BrickPi3<T> {
    /// Configure the sensor type of every port in `ports`.
    ///
    /// `flags` are sent for `Custom` and `I2c` types. `I2c` also requires
    /// `i2c`; with the repeat flag set its transaction is sent along and its
    /// read length becomes the expected read length of each port.
    pub fn set_sensor_type(
        &mut self,
        ports: impl Into<PortMask>,
        sensor_type: SensorType,
        flags: SensorConfigFlags,
        i2c: Option<&I2cConfig>,
    ) -> Result<(), BrickPiError> {
        let ports = ports.into();
        if sensor_type == SensorType::I2c && i2c.is_none() {
            return Err(BrickPiError::MissingI2cConfig);
        }

        for index in ports.indices() {
            self.sensor_types[index] = Some(sensor_type);
        }

        let mut frame = self
            .frame(MessageType::SetSensorType)
            .with_u8(ports.bits())
            .with_u8(sensor_type.into());

        match (sensor_type, i2c) {
            (SensorType::Custom, _) => {
                frame = frame.with_u16(flags.into());
            }
            (SensorType::I2c, Some(config)) => {
                frame = frame.with_u8((u16::from(flags) & 0xFF) as u8).with_u8(config.speed);
                if flags.i2c_repeat() {
                    let transaction = &config.transaction;
                    let read_len = transaction.capped_read_len();
                    let write = transaction.capped_write();
                    for index in ports.indices() {
                        self.i2c_read_lengths[index] = read_len;
                    }
                    frame = frame
                        .with_u32(config.delay_us)
                        .with_u8(transaction.address)
                        .with_u8(read_len)
                        .with_u8(write.len() as u8)
                        .with_slice(write);
                }
            }
            _ => {}
        }

        info!("Configuring ports {:#04x} as {}", ports.bits(), sensor_type);
        self.write(frame)
    }

    /// The host's record of `port`'s configured type.
    pub fn sensor_type(&self, port: SensorPort) -> Option<SensorType> {
        self.sensor_types[port.index()]
    }

    /// Read the sensor on `port`.
    ///
    /// A non-valid state reported by the board is returned as
    /// `BrickPiError::SensorState` carrying that state; `Configuring` is
    /// expected for a while after `set_sensor_type`.
    pub fn get_sensor(&mut self, port: SensorPort) -> Result<SensorReading, BrickPiError> {
        let index = port.index();
        let i2c_read_len = self.i2c_read_lengths[index] as usize;
        let Some((sensor_type, len)) = self.sensor_types[index]
            .and_then(|t| t.response_len(i2c_read_len).map(|len| (t, len)))
        else {
            return Err(BrickPiError::SensorState(SensorState::NotConfigured));
        };

        let payload = self.read(MessageType::get_sensor(port), len)?;
        let echoed = payload[0];
        if !sensor_type.accepts_echo(echoed) {
            warn!("{} configured as {} but board reports type {}", port, sensor_type, echoed);
            return Err(BrickPiError::SensorTypeMismatch {
                expected: sensor_type.into(),
                actual: echoed,
            });
        }

        let state = SensorState::from_primitive(payload[1]);
        if state != SensorState::ValidData {
            debug!("{} state: {}", port, state);
            return Err(BrickPiError::SensorState(state));
        }

        SensorReading::decode(sensor_type, &payload[SENSOR_PREFIX_SIZE..], i2c_read_len)
    }
}
