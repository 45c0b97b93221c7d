use crate::config::BrickPiConfig;
use crate::constants::{
    BOARD_NAME, BROADCAST_ADDRESS, ID_LENGTH, LED_FIRMWARE_CONTROL, MANUFACTURER, MOTOR_FLOAT, PORT_COUNT,
    RESPONSE_HEADER_SIZE,
};
use crate::error::BrickPiError;
use crate::frame::{self, Frame};
use crate::info::{BoardInfo, Version, VoltageRail, Voltages, decode_string, millivolts_to_volts};
use crate::message::MessageType;
use crate::port::PortMask;
use crate::sensor::{SensorConfigFlags, SensorType};
use crate::transport::Transport;
use bytes::{Buf, Bytes, BytesMut};
use num_enum::TryFromPrimitive;
use tracing::{debug, error, info, warn};

/// Handle to one BrickPi3 board.
///
/// The handle owns the transport and the host-side record of each sensor
/// port's configured type and expected I2C read length. Every method performs
/// its exchanges synchronously and returns before the next may start.
pub struct BrickPi3<T: Transport> {
    transport: T,
    config: BrickPiConfig,
    pub(crate) sensor_types: [Option<SensorType>; PORT_COUNT],
    pub(crate) i2c_read_lengths: [u8; PORT_COUNT],
}

impl<T: Transport> BrickPi3<T> {
    /// Create a handle at the default address (1).
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: BrickPiConfig::default(),
            sensor_types: [None; PORT_COUNT],
            i2c_read_lengths: [0; PORT_COUNT],
        }
    }

    pub fn with_config(transport: T, config: BrickPiConfig) -> Result<Self, BrickPiError> {
        if config.address == BROADCAST_ADDRESS {
            return Err(BrickPiError::InvalidAddress(config.address));
        }
        info!("BrickPi3 handle at address {}", config.address);
        Ok(Self {
            transport,
            config,
            sensor_types: [None; PORT_COUNT],
            i2c_read_lengths: [0; PORT_COUNT],
        })
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    pub fn config(&self) -> &BrickPiConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Start an outbound frame addressed to this board.
    pub(crate) fn frame(&self, message_type: MessageType) -> Frame {
        Frame::new(self.config.address, message_type)
    }

    /// Run one exchange and return the raw inbound bytes.
    pub(crate) fn exchange(&mut self, frame: Frame) -> Result<Bytes, BrickPiError> {
        exchange_raw(&mut self.transport, frame)
    }

    /// Send a command frame. Commands carry no reply, so the sentinel is not checked.
    pub(crate) fn write(&mut self, frame: Frame) -> Result<(), BrickPiError> {
        self.exchange(frame)?;
        Ok(())
    }

    /// Send a read request of `len` bytes and return the validated payload.
    pub(crate) fn read(&mut self, message_type: MessageType, len: usize) -> Result<Bytes, BrickPiError> {
        let request = Frame::read_request(self.config.address, message_type, len);
        let inbound = self.exchange(request)?;
        if let Err(e) = frame::decode(&inbound) {
            warn!("No reply ready for {} at address {}", message_type, self.config.address);
            return Err(e);
        }
        Ok(inbound.slice(RESPONSE_HEADER_SIZE..))
    }

    /// Read a message whose exchange length is fixed by [`MessageType::frame_len`].
    pub(crate) fn read_fixed(&mut self, message_type: MessageType) -> Result<Bytes, BrickPiError> {
        let len = message_type
            .frame_len()
            .ok_or(BrickPiError::UnsizedMessage(message_type))?;
        self.read(message_type, len)
    }

    fn read_u16(&mut self, message_type: MessageType) -> Result<u16, BrickPiError> {
        let mut payload = self.read_fixed(message_type)?;
        Ok(payload.get_u16())
    }

    pub(crate) fn read_u32(&mut self, message_type: MessageType) -> Result<u32, BrickPiError> {
        let mut payload = self.read_fixed(message_type)?;
        Ok(payload.get_u32())
    }

    fn read_string(&mut self, message_type: MessageType) -> Result<String, BrickPiError> {
        let payload = self.read_fixed(message_type)?;
        Ok(decode_string(&payload))
    }

    /// Manufacturer string, "Dexter Industries" on a genuine board.
    pub fn get_manufacturer(&mut self) -> Result<String, BrickPiError> {
        self.read_string(MessageType::GetManufacturer)
    }

    /// Board name, "BrickPi3".
    pub fn get_board(&mut self) -> Result<String, BrickPiError> {
        self.read_string(MessageType::GetName)
    }

    pub fn get_version_hardware(&mut self) -> Result<Version, BrickPiError> {
        self.read_u32(MessageType::GetHardwareVersion).map(Version::from)
    }

    pub fn get_version_firmware(&mut self) -> Result<Version, BrickPiError> {
        self.read_u32(MessageType::GetFirmwareVersion).map(Version::from)
    }

    /// The 16-byte serial number, as 32 upper-case hex digits.
    pub fn get_id(&mut self) -> Result<String, BrickPiError> {
        let payload = self.read_fixed(MessageType::GetId)?;
        let id = payload.get(..ID_LENGTH).ok_or(BrickPiError::ResponseLength {
            expected: ID_LENGTH,
            actual: payload.len(),
        })?;
        Ok(hex::encode_upper(id))
    }

    pub fn get_info(&mut self) -> Result<BoardInfo, BrickPiError> {
        Ok(BoardInfo {
            manufacturer: self.get_manufacturer()?,
            board: self.get_board()?,
            hardware_version: self.get_version_hardware()?,
            firmware_version: self.get_version_firmware()?,
            id: self.get_id()?,
        })
    }

    /// Set the LED brightness (0 to 100), or pass 255 to give LED control
    /// back to the firmware.
    pub fn set_led(&mut self, value: u8) -> Result<(), BrickPiError> {
        let frame = self.frame(MessageType::SetLed).with_u8(value);
        self.write(frame)
    }

    pub fn get_voltage(&mut self, rail: VoltageRail) -> Result<f32, BrickPiError> {
        self.read_u16(rail.message_type()).map(millivolts_to_volts)
    }

    pub fn get_voltage_3v3(&mut self) -> Result<f32, BrickPiError> {
        self.get_voltage(VoltageRail::V3_3)
    }

    pub fn get_voltage_5v(&mut self) -> Result<f32, BrickPiError> {
        self.get_voltage(VoltageRail::V5)
    }

    pub fn get_voltage_9v(&mut self) -> Result<f32, BrickPiError> {
        self.get_voltage(VoltageRail::V9)
    }

    pub fn get_voltage_battery(&mut self) -> Result<f32, BrickPiError> {
        self.get_voltage(VoltageRail::Battery)
    }

    pub fn get_voltages(&mut self) -> Result<Voltages, BrickPiError> {
        Ok(Voltages {
            v3_3: self.get_voltage_3v3()?,
            v5: self.get_voltage_5v()?,
            v9: self.get_voltage_9v()?,
            battery: self.get_voltage_battery()?,
        })
    }

    /// Confirm that a BrickPi3 with compatible firmware answers at this address.
    ///
    /// With `critical` set, any failure is logged and the process exits with
    /// status 1. Otherwise the failure is returned.
    pub fn detect(&mut self, critical: bool) -> Result<(), BrickPiError> {
        match self.check_identity() {
            Ok(version) => {
                info!("Detected BrickPi3 at address {} (firmware {})", self.config.address, version);
                Ok(())
            }
            Err(e) if critical => {
                error!("detect error: {}", e);
                std::process::exit(1);
            }
            Err(e) => Err(e),
        }
    }

    fn check_identity(&mut self) -> Result<Version, BrickPiError> {
        let manufacturer = self.get_manufacturer()?;
        if !manufacturer.starts_with(MANUFACTURER) {
            return Err(BrickPiError::WrongManufacturer(manufacturer));
        }

        let board = self.get_board()?;
        if !board.starts_with(BOARD_NAME) {
            return Err(BrickPiError::WrongDevice(board));
        }

        let version = self.get_version_firmware()?;
        let actual = version.to_string();
        if !actual.starts_with(&self.config.firmware_prefix) {
            return Err(BrickPiError::FirmwareMismatch {
                required: self.config.firmware_prefix.clone(),
                actual,
            });
        }
        Ok(version)
    }

    /// Unconfigure all sensors, float all motors with no limits and return
    /// LED control to the firmware.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn reset_all(&mut self) -> Result<(), BrickPiError> {
        info!("Resetting sensors, motors and LED");
        let sensors = self.set_sensor_type(PortMask::ALL, SensorType::None, SensorConfigFlags::new(), None);
        let power = self.set_motor_power(PortMask::ALL, MOTOR_FLOAT);
        let limits = self.set_motor_limits(PortMask::ALL, 0, 0);
        let led = self.set_led(LED_FIRMWARE_CONTROL);
        sensors.and(power).and(limits).and(led)
    }
}

fn exchange_raw<T: Transport + ?Sized>(transport: &mut T, frame: Frame) -> Result<Bytes, BrickPiError> {
    if let Ok(message_type) = MessageType::try_from_primitive(frame.message_type()) {
        debug_assert!(
            message_type.frame_len().is_none_or(|len| len == frame.len()),
            "{} frame is {} bytes, expected {:?}",
            message_type,
            frame.len(),
            message_type.frame_len()
        );
    }
    let tx = frame.freeze();
    let mut rx = BytesMut::zeroed(tx.len());
    debug!(bytes = hex::encode(&tx), "SPI Write");
    transport.transfer(&tx, &mut rx)?;
    debug!(bytes = hex::encode(&rx), "SPI Read");
    Ok(rx.freeze())
}

/// Assign a new address to a board by broadcasting on address 0.
///
/// `id` selects the board by serial number (32 hex digits, as returned by
/// [`BrickPi3::get_id`]); an empty `id` addresses every board on the bus.
pub fn set_address<T: Transport + ?Sized>(transport: &mut T, address: u8, id: &str) -> Result<(), BrickPiError> {
    if address == BROADCAST_ADDRESS {
        return Err(BrickPiError::InvalidAddress(address));
    }
    let token: [u8; ID_LENGTH] = match id.len() {
        0 => [0; ID_LENGTH],
        32 => {
            let bytes = hex::decode(id).map_err(|_| BrickPiError::InvalidId(id.to_string()))?;
            bytes
                .try_into()
                .map_err(|_| BrickPiError::InvalidId(id.to_string()))?
        }
        _ => return Err(BrickPiError::InvalidId(id.to_string())),
    };

    info!("Assigning address {} to board {:?}", address, if id.is_empty() { "<any>" } else { id });
    let frame = Frame::new(BROADCAST_ADDRESS, MessageType::SetAddress)
        .with_u8(address)
        .with_slice(&token);
    exchange_raw(transport, frame)?;
    Ok(())
}
