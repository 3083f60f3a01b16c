// Sabertooth packetized serial protocol implementation
//
// Transmit-only link, the controller never answers.
// Packet format: [Address, Command, Value, Checksum], checksum = (address + command + value) & 0x7F

use serialport::{self, SerialPort};
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use crate::messages::MotorId;

/// Default serial configuration (DIP switches set for packet serial, address 128)
pub const DEFAULT_BAUDRATE: u32 = 9600;
pub const DEFAULT_ADDRESS: u8 = 128;
pub const MIN_ADDRESS: u8 = 128;
pub const MAX_ADDRESS: u8 = 135;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Largest power magnitude the controller accepts
pub const MAX_POWER: i16 = 126;

/// Baud-rate detection byte, sent once after power-up
const AUTOBAUD_BYTE: u8 = 0xAA;

/// Controller start-up and autobaud settle times
pub const POWER_UP_DELAY: Duration = Duration::from_millis(200);
pub const AUTOBAUD_LEAD_IN: Duration = Duration::from_millis(1500);
pub const AUTOBAUD_SETTLE: Duration = Duration::from_millis(500);

/// Serial timeout register unit
const TIMEOUT_STEP_MS: u64 = 100;

/// Command set (subset used by the runtime)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Motor1Forward = 0,
    Motor1Backward = 1,
    Motor2Forward = 4,
    Motor2Backward = 5,
    SerialTimeout = 14,
}

impl Command {
    /// Motor command for a channel and direction of travel
    pub fn for_motor(motor: MotorId, reverse: bool) -> Self {
        match (motor, reverse) {
            (MotorId::Left, false) => Command::Motor1Forward,
            (MotorId::Left, true) => Command::Motor1Backward,
            (MotorId::Right, false) => Command::Motor2Forward,
            (MotorId::Right, true) => Command::Motor2Backward,
        }
    }
}

/// Error types for Sabertooth communication
#[derive(Debug, thiserror::Error)]
pub enum SabertoothError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SabertoothError>;

/// Sabertooth controller on a serial line
pub struct Sabertooth<W: Write> {
    port: W,
    address: u8,
}

impl Sabertooth<Box<dyn SerialPort>> {
    /// Open a new connection to the controller
    pub fn open(port_name: &str, address: u8) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE, address)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32, address: u8) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self::new(port, address))
    }
}

impl<W: Write> Sabertooth<W> {
    /// Wrap an already-open writer
    pub fn new(port: W, address: u8) -> Self {
        Self { port, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Calculate checksum for a packet
    fn checksum(address: u8, command: u8, value: u8) -> u8 {
        address.wrapping_add(command).wrapping_add(value) & 0x7F
    }

    /// Build a 4-byte command packet
    fn build_packet(address: u8, command: Command, value: u8) -> [u8; 4] {
        let command = command as u8;
        [
            address,
            command,
            value,
            Self::checksum(address, command, value),
        ]
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Send a raw command to this controller's address
    pub fn command(&mut self, command: Command, value: u8) -> Result<()> {
        let packet = Self::build_packet(self.address, command, value);
        debug!(
            "Sabertooth {}: cmd={:?}, value={}",
            self.address, command, value
        );
        self.send_packet(&packet)
    }

    /// Drive one motor; power is clamped to [-126, 126], the sign picks the direction
    pub fn motor(&mut self, motor: MotorId, power: i16) -> Result<()> {
        let power = power.clamp(-MAX_POWER, MAX_POWER);
        let command = Command::for_motor(motor, power < 0);
        self.command(command, power.unsigned_abs() as u8)
    }

    /// Stop both motors
    pub fn stop(&mut self) -> Result<()> {
        self.motor(MotorId::Left, 0)?;
        self.motor(MotorId::Right, 0)
    }

    /// Controller stops the motors if no packet arrives within `timeout`
    /// (rounded up to 100 ms steps). `Duration::ZERO` disables it.
    pub fn set_serial_timeout(&mut self, timeout: Duration) -> Result<()> {
        let steps = (timeout.as_millis() as u64).div_ceil(TIMEOUT_STEP_MS).min(127);
        self.command(Command::SerialTimeout, steps as u8)
    }

    /// Send the autobaud byte so the controller locks onto our baud rate
    ///
    /// The controller wants `AUTOBAUD_LEAD_IN` of quiet before it and
    /// `AUTOBAUD_SETTLE` after it; waiting is up to the caller.
    pub fn autobaud(&mut self) -> Result<()> {
        debug!("Sending autobaud byte");
        self.send_packet(&[AUTOBAUD_BYTE])
    }

    /// Access the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.port
    }
}
