use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use std::process;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use brickpi3_lib::constants::{DEFAULT_ADDRESS, SPI_TARGET_SPEED_HZ, SPIDEV_PATH};
use brickpi3_lib::transport::{SpiConfig, SpidevTransport};
use brickpi3_lib::{
    BrickPi3, BrickPiConfig, I2cConfig, I2cTransaction, PortMask, SensorConfigFlags, SensorPort, SensorType,
    set_address,
};

/// Command-line access to a BrickPi3 over Linux spidev.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SPI address of the board (1-255).
    #[arg(short, long, default_value_t = DEFAULT_ADDRESS)]
    address: u8,
    /// spidev device node.
    #[arg(long, default_value = SPIDEV_PATH)]
    spidev: PathBuf,
    /// SPI clock in Hz.
    #[arg(long, default_value_t = SPI_TARGET_SPEED_HZ)]
    speed_hz: u32,
    /// Skip the manufacturer, board and firmware check.
    #[arg(long)]
    no_detect: bool,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print manufacturer, board, versions and serial number.
    Info,
    /// Print all four rail voltages.
    Voltages,
    /// Set LED brightness (0-100), or 255 for firmware control.
    Led { value: u8 },
    /// Configure a sensor port and poll its readings.
    Sensor {
        /// Port 1-4.
        #[arg(value_parser = parse_sensor_port)]
        port: SensorPort,
        /// Sensor type, by name (e.g. Ev3GyroAbsDps) or numeric code.
        #[arg(value_parser = parse_sensor_type)]
        sensor_type: SensorType,
        /// Number of readings to print.
        #[arg(short, long, default_value_t = 10)]
        count: u32,
        /// Polling interval in milliseconds.
        #[arg(short, long, default_value_t = 100)]
        interval_ms: u64,
    },
    /// Run one I2C transaction on a sensor port.
    I2c {
        #[arg(value_parser = parse_sensor_port)]
        port: SensorPort,
        /// Target address (bits 1-7).
        #[arg(value_parser = parse_u8_auto)]
        target: u8,
        /// Bytes to write, as hex.
        #[arg(short, long, default_value = "")]
        write: String,
        /// Bytes to read back (at most 16).
        #[arg(short, long, default_value_t = 0)]
        read: usize,
        /// Bus speed, in microseconds per bit.
        #[arg(long, default_value_t = 0)]
        speed: u8,
    },
    /// Control or query motors.
    Motor {
        /// Motor ports, e.g. A, BC or ABCD.
        #[arg(value_parser = parse_motor_ports)]
        ports: PortMask,
        #[command(subcommand)]
        action: MotorAction,
    },
    /// Unconfigure sensors, float motors and return the LED to the firmware.
    Reset,
    /// Broadcast a new address to a board, selected by serial number.
    SetAddress {
        new_address: u8,
        /// 32-digit serial number; empty addresses any board.
        #[arg(long, default_value = "")]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum MotorAction {
    /// Set PWM power, -100 to 100, or -128 to float.
    Power {
        #[arg(allow_hyphen_values = true)]
        power: i8,
    },
    /// Run to an absolute encoder position, in degrees.
    Position {
        #[arg(allow_hyphen_values = true)]
        degrees: i32,
    },
    /// Run relative to the current position, in degrees.
    Relative {
        #[arg(allow_hyphen_values = true)]
        degrees: i32,
    },
    /// Run at a target speed, in degrees per second.
    Dps {
        #[arg(allow_hyphen_values = true)]
        dps: i16,
    },
    /// Set power (percent) and speed (degrees per second) limits; 0 is no limit.
    Limits { power: u8, dps: u16 },
    /// Print encoder positions.
    Encoder,
    /// Make the encoders read the given value at their current position.
    SetEncoder {
        #[arg(allow_hyphen_values = true)]
        value: i32,
    },
    /// Zero the encoders.
    ResetEncoder,
    /// Print power, position, speed and status flags.
    Status,
}

fn parse_sensor_port(s: &str) -> Result<SensorPort, String> {
    s.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(SensorPort::from_index)
        .ok_or_else(|| format!("invalid sensor port {:?}, expected 1-4", s))
}

fn parse_motor_ports(s: &str) -> Result<PortMask, String> {
    let mut bits = 0u8;
    for c in s.chars() {
        let index = match c.to_ascii_uppercase() {
            'A' => 0,
            'B' => 1,
            'C' => 2,
            'D' => 3,
            _ => return Err(format!("invalid motor port {:?}, expected A-D", c)),
        };
        bits |= 1 << index;
    }
    PortMask::new(bits).map_err(|e| e.to_string())
}

fn parse_sensor_type(s: &str) -> Result<SensorType, String> {
    if let Ok(code) = s.parse::<u8>() {
        return SensorType::try_from(code).map_err(|_| format!("unknown sensor type code {}", code));
    }
    (1u8..=28)
        .filter_map(|code| SensorType::try_from(code).ok())
        .find(|t| t.to_string().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown sensor type {:?}", s))
}

fn parse_u8_auto(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte {:?}: {}", s, e))
}

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry().with(filter).with(console_layer).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let spi_config = SpiConfig {
        path: cli.spidev.clone(),
        speed_hz: cli.speed_hz,
    };
    let mut transport =
        SpidevTransport::open(&spi_config).with_context(|| format!("Failed to open {}", cli.spidev.display()))?;

    if let Command::SetAddress { new_address, id } = &cli.command {
        // Broadcast, so there is no board to detect first
        set_address(&mut transport, *new_address, id).context("Failed to set address")?;
        info!("Address set to {}", new_address);
        return Ok(());
    }

    let mut bp = BrickPi3::with_config(transport, BrickPiConfig::with_address(cli.address))?;
    if !cli.no_detect {
        bp.detect(false)
            .with_context(|| format!("No compatible BrickPi3 at address {}", cli.address))?;
    }

    match cli.command {
        Command::Info => println!("{}", bp.get_info()?),
        Command::Voltages => println!("{}", bp.get_voltages()?),
        Command::Led { value } => bp.set_led(value)?,
        Command::Sensor {
            port,
            sensor_type,
            count,
            interval_ms,
        } => {
            if sensor_type == SensorType::I2c {
                bail!("Use the i2c command for I2C sensors");
            }
            bp.set_sensor_type(port, sensor_type, SensorConfigFlags::new(), None)?;
            poll_sensor(&mut bp, port, count, Duration::from_millis(interval_ms))?;
        }
        Command::I2c {
            port,
            target,
            write,
            read,
            speed,
        } => {
            let bytes = hex::decode(&write).with_context(|| format!("Invalid hex {:?}", write))?;
            let transaction = I2cTransaction::new(target, bytes, read);
            let config = I2cConfig {
                speed,
                ..I2cConfig::default()
            };
            bp.set_sensor_type(port, SensorType::I2c, SensorConfigFlags::new(), Some(&config))?;
            bp.transact_i2c(port, &transaction)?;
            poll_sensor(&mut bp, port, 1, Duration::from_millis(10))?;
        }
        Command::Motor { ports, action } => run_motor(&mut bp, ports, action)?,
        Command::Reset => bp.reset_all()?,
        Command::SetAddress { .. } => {}
    }
    Ok(())
}

/// Print `count` valid readings, polling again while the board is not ready.
fn poll_sensor(bp: &mut BrickPi3<SpidevTransport>, port: SensorPort, count: u32, interval: Duration) -> Result<()> {
    let mut printed = 0;
    while printed < count {
        match bp.get_sensor(port) {
            Ok(reading) => {
                println!("{}: {}", port, reading);
                printed += 1;
            }
            Err(e) if e.is_transient() => debug!("{}: {}", port, e),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", port)),
        }
        sleep(interval);
    }
    Ok(())
}

fn run_motor(bp: &mut BrickPi3<SpidevTransport>, ports: PortMask, action: MotorAction) -> Result<()> {
    match action {
        MotorAction::Power { power } => bp.set_motor_power(ports, power)?,
        MotorAction::Position { degrees } => bp.set_motor_position(ports, degrees)?,
        MotorAction::Relative { degrees } => bp.set_motor_position_relative(ports, degrees)?,
        MotorAction::Dps { dps } => bp.set_motor_dps(ports, dps)?,
        MotorAction::Limits { power, dps } => bp.set_motor_limits(ports, power, dps)?,
        MotorAction::Encoder => {
            for port in ports.motor_ports() {
                println!("{}: {}", port, bp.get_motor_encoder(port)?);
            }
        }
        MotorAction::SetEncoder { value } => {
            for port in ports.motor_ports() {
                bp.set_motor_encoder(port, value)?;
            }
        }
        MotorAction::ResetEncoder => bp.reset_motor_encoders(ports)?,
        MotorAction::Status => {
            for port in ports.motor_ports() {
                println!("{}: {}", port, bp.get_motor_status(port)?);
            }
        }
    }
    Ok(())
}
