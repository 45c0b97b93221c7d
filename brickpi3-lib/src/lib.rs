pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod frame;
pub mod i2c;
pub mod info;
pub mod message;
pub mod motor;
pub mod port;
pub mod sensor;
pub mod transport;


// Re-export the handle and the types most callers need
pub use config::BrickPiConfig;
pub use device::{BrickPi3, set_address};
pub use error::BrickPiError;
pub use i2c::{I2cConfig, I2cTransaction};
pub use motor::MotorStatus;
pub use port::{MotorPort, PortMask, SensorPort};
pub use sensor::{SensorConfigFlags, SensorReading, SensorState, SensorType};
pub use transport::Transport;
