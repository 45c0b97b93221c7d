mod common;

use brickpi3_lib::info::{Version, VoltageRail};
use brickpi3_lib::{BrickPiConfig, SensorConfigFlags, set_address};
use common::*;

#[test]
fn test_detect_genuine_board() {
    init_tracing();
    let mut bp = sim_brickpi();
    bp.detect(false).unwrap();

    let sent: Vec<u8> = bp.transport().frames.iter().map(|f| f[1]).collect();
    assert_eq!(sent, vec![1, 2, 4]);
}

#[test]
fn test_detect_firmware_mismatch() {
    let mut bp = BrickPi3::new(SimBoard::new().with_firmware(1_003_002));
    match bp.detect(false) {
        Err(BrickPiError::FirmwareMismatch { required, actual }) => {
            assert_eq!(required, "1.4.");
            assert_eq!(actual, "1.3.2");
        }
        other => panic!("Expected FirmwareMismatch, got {:?}", other),
    }
}

#[test]
fn test_detect_wrong_manufacturer() {
    let mut board = SimBoard::new();
    board.manufacturer = "Acme".to_string();
    let mut bp = BrickPi3::new(board);
    assert!(matches!(bp.detect(false), Err(BrickPiError::WrongManufacturer(m)) if m == "Acme"));
    // Stops after the first check
    assert_eq!(bp.transport().frames.len(), 1);
}

#[test]
fn test_detect_wrong_device() {
    let mut board = SimBoard::new();
    board.board = "GoPiGo3".to_string();
    let mut bp = BrickPi3::new(board);
    assert!(matches!(bp.detect(false), Err(BrickPiError::WrongDevice(b)) if b == "GoPiGo3"));
}

#[test]
fn test_detect_no_board_at_address() {
    let mut bp = BrickPi3::with_config(SimBoard::new(), BrickPiConfig::with_address(2)).unwrap();
    assert!(matches!(bp.detect(false), Err(BrickPiError::ResponseNotReady)));
}

#[test]
fn test_detect_with_custom_firmware_prefix() {
    let config = BrickPiConfig {
        firmware_prefix: "1.3.".to_string(),
        ..BrickPiConfig::default()
    };
    let mut bp = BrickPi3::with_config(SimBoard::new().with_firmware(1_003_007), config).unwrap();
    bp.detect(false).unwrap();
}

#[test]
fn test_broadcast_address_rejected() {
    assert!(matches!(
        BrickPi3::with_config(SimBoard::new(), BrickPiConfig::with_address(0)),
        Err(BrickPiError::InvalidAddress(0))
    ));
}

#[test]
fn test_identity_reads() {
    let mut bp = sim_brickpi();
    assert_eq!(bp.get_manufacturer().unwrap(), "Dexter Industries");
    assert_eq!(bp.get_board().unwrap(), "BrickPi3");
    assert_eq!(bp.get_version_hardware().unwrap(), Version::new(3, 2, 1));
    assert_eq!(bp.get_version_firmware().unwrap().to_string(), "1.4.2");
    assert_eq!(bp.get_id().unwrap(), "00112233445566778899AABBCCDDEEFF");

    let frames = &bp.transport().frames;
    assert_eq!(frames[0].len(), 24);
    assert_eq!(frames[2].len(), 8);
    assert_eq!(frames[4].len(), 20);
}

#[test]
fn test_info_display() {
    let mut bp = sim_brickpi();
    let info = bp.get_info().unwrap();
    let text = info.to_string();
    assert!(text.contains("Serial Number   : 00112233445566778899AABBCCDDEEFF"));
    assert!(text.contains("Firmware version: 1.4.2"));
}

#[test]
fn test_voltages() {
    let mut bp = sim_brickpi();
    assert!((bp.get_voltage_3v3().unwrap() - 3.3).abs() < 1e-4);
    assert!((bp.get_voltage_5v().unwrap() - 5.01).abs() < 1e-4);
    assert!((bp.get_voltage_9v().unwrap() - 9.12).abs() < 1e-4);
    assert!((bp.get_voltage_battery().unwrap() - 10.45).abs() < 1e-4);

    let sent: Vec<u8> = bp.transport().frames.iter().map(|f| f[1]).collect();
    assert_eq!(sent, vec![7, 8, 9, 10]);
    assert!(bp.transport().frames.iter().all(|f| f.len() == 6));

    let all = bp.get_voltages().unwrap();
    assert_eq!(all.battery, bp.get_voltage(VoltageRail::Battery).unwrap());
}

#[test]
fn test_response_not_ready() {
    let mut board = SimBoard::new();
    board.not_ready = true;
    let mut bp = BrickPi3::new(board);
    let err = bp.get_voltage_battery().unwrap_err();
    assert!(matches!(err, BrickPiError::ResponseNotReady));
    assert!(err.is_transient());
}

#[test]
fn test_set_led() {
    let mut bp = sim_brickpi();
    bp.set_led(50).unwrap();
    assert_eq!(bp.transport().last_frame(), &[0x01, 0x06, 50]);
}

#[test]
fn test_commands_ignore_missing_sentinel() {
    let mut board = SimBoard::new();
    board.not_ready = true;
    let mut bp = BrickPi3::new(board);
    bp.set_led(255).unwrap();
    bp.set_motor_power(MotorPort::A, 0).unwrap();
}

#[test]
fn test_reset_all() {
    let mut bp = sim_brickpi();
    bp.set_sensor_type(SensorPort::Port2, SensorType::TouchEv3, SensorConfigFlags::new(), None)
        .unwrap();
    bp.transport_mut().clear_frames();

    bp.reset_all().unwrap();
    let frames = &bp.transport().frames;
    assert_eq!(
        frames,
        &vec![
            vec![0x01, 12, 0x0F, 1],
            vec![0x01, 21, 0x0F, 0x80],
            vec![0x01, 28, 0x0F, 0, 0, 0],
            vec![0x01, 6, 0xFF],
        ]
    );
    assert_eq!(bp.sensor_type(SensorPort::Port2), Some(SensorType::None));
}

#[test]
fn test_set_address_broadcast_frame() {
    let mut board = SimBoard::new();
    let id = "00112233445566778899AABBCCDDEEFF";
    set_address(&mut board, 3, id).unwrap();

    let mut expected = vec![0x00, 11, 3];
    expected.extend(hex::decode(id).unwrap());
    assert_eq!(board.last_frame(), expected.as_slice());
    assert_eq!(board.last_frame().len(), 19);
}

#[test]
fn test_set_address_any_board() {
    let mut board = SimBoard::new();
    set_address(&mut board, 5, "").unwrap();
    let frame = board.last_frame();
    assert_eq!(&frame[..3], &[0x00, 11, 5]);
    assert!(frame[3..].iter().all(|&b| b == 0));
    assert_eq!(frame.len(), 19);
}

#[test]
fn test_set_address_rejects_bad_arguments() {
    let mut board = SimBoard::new();
    assert!(matches!(set_address(&mut board, 0, ""), Err(BrickPiError::InvalidAddress(0))));
    assert!(matches!(set_address(&mut board, 2, "1234"), Err(BrickPiError::InvalidId(_))));
    assert!(matches!(
        set_address(&mut board, 2, "zz112233445566778899AABBCCDDEEFF"),
        Err(BrickPiError::InvalidId(_))
    ));
    assert!(board.frames.is_empty());
}

#[test]
fn test_fixed_frame_lengths() {
    let mut bp = sim_brickpi();
    bp.get_info().unwrap();
    bp.get_voltages().unwrap();
    bp.set_led(50).unwrap();
    let ports = MotorPort::A | MotorPort::C;
    bp.set_motor_power(ports, 30).unwrap();
    bp.set_motor_position(ports, -720).unwrap();
    bp.set_motor_position_kp(ports, 25).unwrap();
    bp.set_motor_position_kd(ports, 70).unwrap();
    bp.set_motor_dps(ports, 360).unwrap();
    bp.set_motor_dps_kp(ports, 25).unwrap();
    bp.set_motor_dps_kd(ports, 70).unwrap();
    bp.set_motor_limits(ports, 50, 500).unwrap();
    bp.offset_motor_encoder(ports, 10).unwrap();
    for port in [MotorPort::A, MotorPort::B, MotorPort::C, MotorPort::D] {
        bp.get_motor_encoder(port).unwrap();
        bp.get_motor_status(port).unwrap();
    }
    set_address(bp.transport_mut(), 2, "").unwrap();

    let frames = &bp.transport().frames;
    assert_eq!(frames.len(), 28);
    for frame in frames {
        let message_type = MessageType::try_from(frame[1]).unwrap();
        assert_eq!(Some(frame.len()), message_type.frame_len(), "{} frame", message_type);
    }

    for message_type in [
        MessageType::SetSensorType,
        MessageType::GetSensor2,
        MessageType::I2cTransact4,
    ] {
        assert_eq!(message_type.frame_len(), None);
    }
}

const DETECT_CHILD_ENV: &str = "BRICKPI3_DETECT_CRITICAL_CHILD";

/// `detect(true)` ends the process, so it runs in a child copy of this test binary.
#[test]
fn test_detect_critical_exits() {
    if std::env::var_os(DETECT_CHILD_ENV).is_some() {
        let mut bp = BrickPi3::new(SimBoard::new().with_firmware(1_003_002));
        let _ = bp.detect(true);
        return;
    }

    let output = std::process::Command::new(std::env::current_exe().unwrap())
        .args(["test_detect_critical_exits", "--exact", "--nocapture", "--test-threads=1"])
        .env(DETECT_CHILD_ENV, "1")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_detect_critical_passes_on_genuine_board() {
    let mut bp = sim_brickpi();
    bp.detect(true).unwrap();
    assert_eq!(bp.transport().frames.len(), 3);
}
