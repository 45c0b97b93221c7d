//! Common test utilities: a simulated BrickPi3 answering on the far side of
//! the transport.

// Shared across test files, not every item is used in each
#[allow(unused_imports)]
pub use brickpi3_lib::error::BrickPiError;
#[allow(unused_imports)]
pub use brickpi3_lib::message::MessageType;
#[allow(unused_imports)]
pub use brickpi3_lib::{BrickPi3, MotorPort, PortMask, SensorPort, SensorType, Transport};

use num_enum::TryFromPrimitive;
use std::io;

/// What the simulated board reports for one sensor port.
#[derive(Debug, Clone, Default)]
pub struct SimSensor {
    pub echo_type: u8,
    pub state: u8,
    pub data: Vec<u8>,
}

/// A BrickPi3 that answers each exchange from its own state and records every
/// frame it receives.
#[derive(Debug, Clone)]
pub struct SimBoard {
    pub address: u8,
    pub manufacturer: String,
    pub board: String,
    pub hardware_version: u32,
    pub firmware_version: u32,
    pub id: [u8; 16],
    /// 3.3V, 5V, 9V and battery rails, in millivolts
    pub voltages_mv: [u16; 4],
    /// Raw encoder counters, never reset
    pub encoders: [i32; 4],
    /// Accumulated encoder offsets
    pub offsets: [i32; 4],
    pub sensors: [SimSensor; 4],
    pub motor_status: [[u8; 8]; 4],
    /// Drop the sentinel from every reply
    pub not_ready: bool,
    pub frames: Vec<Vec<u8>>,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self {
            address: 1,
            manufacturer: "Dexter Industries".to_string(),
            board: "BrickPi3".to_string(),
            hardware_version: 3_002_001,
            firmware_version: 1_004_002,
            id: std::array::from_fn(|i| i as u8 * 0x11),
            voltages_mv: [3_300, 5_010, 9_120, 10_450],
            encoders: [0; 4],
            offsets: [0; 4],
            sensors: Default::default(),
            motor_status: [[0; 8]; 4],
            not_ready: false,
            frames: Vec::new(),
        }
    }
}

#[allow(dead_code)]
impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_firmware(mut self, version: u32) -> Self {
        self.firmware_version = version;
        self
    }

    /// Make `port` report a type, state and data bytes.
    pub fn set_sensor(&mut self, port: SensorPort, echo_type: u8, state: u8, data: &[u8]) {
        self.sensors[port.index()] = SimSensor {
            echo_type,
            state,
            data: data.to_vec(),
        };
    }

    /// Current encoder reading of `port`, as the host would see it.
    pub fn encoder(&self, port: MotorPort) -> i32 {
        let i = port.index();
        self.encoders[i].wrapping_sub(self.offsets[i])
    }

    pub fn last_frame(&self) -> &[u8] {
        self.frames.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every recorded frame with the given message type.
    pub fn frames_of(&self, message_type: MessageType) -> Vec<&[u8]> {
        let code = u8::from(message_type);
        self.frames
            .iter()
            .filter(|f| f.get(1) == Some(&code))
            .map(Vec::as_slice)
            .collect()
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    fn apply_command(&mut self, message_type: MessageType, tx: &[u8]) {
        match message_type {
            MessageType::SetSensorType => {
                let mask = tx[2];
                for i in (0..4).filter(|i| mask & (1 << i) != 0) {
                    self.sensors[i].echo_type = tx[3];
                }
            }
            MessageType::OffsetMotorEncoder => {
                let mask = tx[2];
                let offset = i32::from_be_bytes([tx[3], tx[4], tx[5], tx[6]]);
                for i in (0..4).filter(|i| mask & (1 << i) != 0) {
                    self.offsets[i] = self.offsets[i].wrapping_add(offset);
                }
            }
            _ => {}
        }
    }

    fn reply_payload(&self, message_type: MessageType) -> Option<Vec<u8>> {
        use MessageType::*;
        let string = |s: &str| {
            let mut bytes = s.as_bytes().to_vec();
            bytes.resize(20, 0);
            bytes
        };
        let payload = match message_type {
            GetManufacturer => string(&self.manufacturer),
            GetName => string(&self.board),
            GetHardwareVersion => self.hardware_version.to_be_bytes().to_vec(),
            GetFirmwareVersion => self.firmware_version.to_be_bytes().to_vec(),
            GetId => self.id.to_vec(),
            GetVoltage3v3 => self.voltages_mv[0].to_be_bytes().to_vec(),
            GetVoltage5v => self.voltages_mv[1].to_be_bytes().to_vec(),
            GetVoltage9v => self.voltages_mv[2].to_be_bytes().to_vec(),
            GetVoltageVcc => self.voltages_mv[3].to_be_bytes().to_vec(),
            GetSensor1 | GetSensor2 | GetSensor3 | GetSensor4 => {
                let sensor = &self.sensors[u8::from(message_type) as usize - u8::from(GetSensor1) as usize];
                let mut bytes = vec![sensor.echo_type, sensor.state];
                bytes.extend_from_slice(&sensor.data);
                bytes
            }
            GetMotorAEncoder | GetMotorBEncoder | GetMotorCEncoder | GetMotorDEncoder => {
                let index = u8::from(message_type) as usize - u8::from(GetMotorAEncoder) as usize;
                let port = MotorPort::from_index(index)?;
                self.encoder(port).to_be_bytes().to_vec()
            }
            GetMotorAStatus | GetMotorBStatus | GetMotorCStatus | GetMotorDStatus => {
                self.motor_status[u8::from(message_type) as usize - u8::from(GetMotorAStatus) as usize].to_vec()
            }
            _ => return Option::None,
        };
        Some(payload)
    }
}

impl Transport for SimBoard {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        if tx.len() != rx.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "tx and rx lengths differ"));
        }
        self.frames.push(tx.to_vec());
        rx.fill(0);
        if tx.len() < 2 || (tx[0] != self.address && tx[0] != 0) {
            return Ok(());
        }
        let Ok(message_type) = MessageType::try_from_primitive(tx[1]) else {
            return Ok(());
        };

        self.apply_command(message_type, tx);
        if self.not_ready || rx.len() < 4 {
            return Ok(());
        }
        if let Some(payload) = self.reply_payload(message_type) {
            rx[0] = tx[0];
            rx[1] = tx[1];
            rx[3] = 0xA5;
            let n = payload.len().min(rx.len() - 4);
            rx[4..4 + n].copy_from_slice(&payload[..n]);
        }
        Ok(())
    }
}

/// A handle talking to a fresh simulated board at address 1.
#[allow(dead_code)]
pub fn sim_brickpi() -> BrickPi3<SimBoard> {
    BrickPi3::new(SimBoard::new())
}

/// Log library output while running tests with `--nocapture`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
