// Protocol constants for the BrickPi3

/// Size of the response header `[echo_address, echo_type, reserved, sentinel]`
pub const RESPONSE_HEADER_SIZE: usize = 4;

/// Offset of the sentinel byte in every response frame
pub const SENTINEL_OFFSET: usize = 3;

/// Marker at `SENTINEL_OFFSET` of a valid response
pub const RESPONSE_SENTINEL: u8 = 0xA5;

/// Longest possible frame (configuring an I2C sensor with a full write buffer)
pub const LONGEST_SPI_TRANSFER: usize = 29;

/// Longest possible I2C read or write
pub const LONGEST_I2C_TRANSFER: usize = 16;

/// Characters in a manufacturer or board name response
pub const STRING_LENGTH: usize = 20;

/// Bytes in the serial number id
pub const ID_LENGTH: usize = 16;

/// Number of sensor or motor ports
pub const PORT_COUNT: usize = 4;

/// Address every BrickPi3 listens on, used only for address assignment
pub const BROADCAST_ADDRESS: u8 = 0;

/// Address a BrickPi3 ships with
pub const DEFAULT_ADDRESS: u8 = 1;

pub const MANUFACTURER: &str = "Dexter Industries";
pub const BOARD_NAME: &str = "BrickPi3";

/// Firmware version needs to start with this
pub const FIRMWARE_VERSION_REQUIRED: &str = "1.4.";

/// Power value that makes a motor float
pub const MOTOR_FLOAT: i8 = -128;

/// LED value that returns LED control to the firmware
pub const LED_FIRMWARE_CONTROL: u8 = 0xFF;

pub const DEFAULT_POSITION_KP: u8 = 25;
pub const DEFAULT_POSITION_KD: u8 = 70;

pub const SPIDEV_PATH: &str = "/dev/spidev0.1";
pub const SPI_TARGET_SPEED_HZ: u32 = 500_000;
