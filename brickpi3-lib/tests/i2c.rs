mod common;

use brickpi3_lib::{I2cConfig, I2cTransaction, SensorConfigFlags, SensorReading};
use common::*;

fn i2c_port(bp: &mut BrickPi3<SimBoard>, port: SensorPort) {
    let config = I2cConfig {
        speed: 10,
        ..I2cConfig::default()
    };
    bp.set_sensor_type(port, SensorType::I2c, SensorConfigFlags::new(), Some(&config))
        .unwrap();
}

#[test]
fn test_transact_frame() {
    let mut bp = sim_brickpi();
    i2c_port(&mut bp, SensorPort::Port2);
    bp.transact_i2c(SensorPort::Port2, &I2cTransaction::new(0x02, [0x41, 0x02], 6))
        .unwrap();
    assert_eq!(bp.transport().last_frame(), &[0x01, 18, 0x02, 6, 2, 0x41, 0x02]);
}

#[test]
fn test_read_length_capped() {
    init_tracing();
    let mut bp = sim_brickpi();
    i2c_port(&mut bp, SensorPort::Port1);

    let transaction = I2cTransaction::new(0x10, vec![0xAA; 20], 40);
    bp.transact_i2c(SensorPort::Port1, &transaction).unwrap();

    let frame = bp.transport().last_frame();
    assert_eq!(frame[3], 16);
    assert_eq!(frame[4], 16);
    assert_eq!(frame.len(), 5 + 16);
    assert_eq!(bp.i2c_read_length(SensorPort::Port1), 16);

    let data: Vec<u8> = (0..16).collect();
    bp.transport_mut().set_sensor(SensorPort::Port1, 2, 0, &data);
    let reading = bp.get_sensor(SensorPort::Port1).unwrap();
    assert_eq!(bp.transport().last_frame().len(), 22);
    assert_eq!(reading, SensorReading::I2c(data));
}

#[test]
fn test_read_returns_requested_bytes() {
    let mut bp = sim_brickpi();
    i2c_port(&mut bp, SensorPort::Port4);
    bp.transact_i2c(SensorPort::Port4, &I2cTransaction::new(0x02, [0x42], 1))
        .unwrap();

    bp.transport_mut().set_sensor(SensorPort::Port4, 2, 0, &[0x7F, 0xEE]);
    assert_eq!(bp.get_sensor(SensorPort::Port4).unwrap(), SensorReading::I2c(vec![0x7F]));
    assert_eq!(bp.transport().last_frame().len(), 7);
}

#[test]
fn test_i2c_error_state() {
    let mut bp = sim_brickpi();
    i2c_port(&mut bp, SensorPort::Port1);
    bp.transact_i2c(SensorPort::Port1, &I2cTransaction::new(0x02, Vec::new(), 2))
        .unwrap();

    bp.transport_mut().set_sensor(SensorPort::Port1, 2, 4, &[]);
    assert!(matches!(
        bp.get_sensor(SensorPort::Port1),
        Err(BrickPiError::SensorState(brickpi3_lib::SensorState::I2cError))
    ));
}
