// Loop timing, drive power, serial link configuration
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motor::sabertooth::{DEFAULT_ADDRESS, DEFAULT_BAUDRATE, MAX_ADDRESS, MIN_ADDRESS};

// Runtime loop frequency; the period is whole milliseconds, so 1000 Hz is the ceiling
pub const LOOP_HZ: u64 = 50;
pub const MAX_LOOP_HZ: u64 = 1000;

// Base power per side (motor controller units, 0..=127)
pub const DEFAULT_POWER: u8 = 20;
pub const MAX_POWER: u8 = 127;

// Serial port for the motor controller (USB-serial adapter wired to S1)
pub const MOTOR_PORT: &str = "/dev/ttyUSB0";

// Enable hardware motor control (set to false for simulation/testing)
pub const MOTOR_ENABLED: bool = true;

// Without key release reports, a key counts as held this long after its last press/repeat
pub const KEY_HOLD: Duration = Duration::from_millis(500);

// Consecutive failed cycles before the loop gives up
pub const MAX_CONSECUTIVE_FAULTS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{side} power {value} exceeds maximum of {max}", max = MAX_POWER)]
    PowerOutOfRange { side: &'static str, value: u8 },

    #[error("Controller address {0} outside {min}..={max}", min = MIN_ADDRESS, max = MAX_ADDRESS)]
    InvalidAddress(u8),

    #[error("Loop rate {0}Hz outside 1..={max}", max = MAX_LOOP_HZ)]
    InvalidLoopRate(u64),

    #[error("Fault limit must be at least 1")]
    InvalidFaultLimit,
}

/// Base power per side, fixed for the lifetime of the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveConfig {
    pub left: u8,
    pub right: u8,
}

impl DriveConfig {
    pub fn new(left: u8, right: u8) -> Result<Self, ConfigError> {
        if left > MAX_POWER {
            return Err(ConfigError::PowerOutOfRange {
                side: "Left",
                value: left,
            });
        }
        if right > MAX_POWER {
            return Err(ConfigError::PowerOutOfRange {
                side: "Right",
                value: right,
            });
        }
        Ok(Self { left, right })
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            left: DEFAULT_POWER,
            right: DEFAULT_POWER,
        }
    }
}

/// Full runtime settings: defaults above, optionally overlaid by a JSON file
/// and then by command-line flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub port: String,
    pub baudrate: u32,
    pub address: u8,
    pub left_power: u8,
    pub right_power: u8,
    pub loop_hz: u64,
    pub simulate: bool,
    pub script: Option<PathBuf>,
    /// Controller-side serial watchdog; 0 leaves it disabled
    pub serial_timeout_ms: u64,
    pub key_hold_ms: u64,
    /// Failed cycles in a row tolerated before the loop stops; at least 1
    pub max_consecutive_faults: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            port: MOTOR_PORT.to_string(),
            baudrate: DEFAULT_BAUDRATE,
            address: DEFAULT_ADDRESS,
            left_power: DEFAULT_POWER,
            right_power: DEFAULT_POWER,
            loop_hz: LOOP_HZ,
            simulate: !MOTOR_ENABLED,
            script: None,
            serial_timeout_ms: 0,
            key_hold_ms: KEY_HOLD.as_millis() as u64,
            max_consecutive_faults: MAX_CONSECUTIVE_FAULTS,
        }
    }
}

impl RuntimeConfig {
    /// Load settings from a JSON file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drive()?;
        if !(MIN_ADDRESS..=MAX_ADDRESS).contains(&self.address) {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if !(1..=MAX_LOOP_HZ).contains(&self.loop_hz) {
            return Err(ConfigError::InvalidLoopRate(self.loop_hz));
        }
        if self.max_consecutive_faults == 0 {
            return Err(ConfigError::InvalidFaultLimit);
        }
        Ok(())
    }

    pub fn drive(&self) -> Result<DriveConfig, ConfigError> {
        DriveConfig::new(self.left_power, self.right_power)
    }

    /// Loop period, never shorter than 1 ms
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis((1000 / self.loop_hz.max(1)).max(1))
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    pub fn serial_timeout(&self) -> Option<Duration> {
        (self.serial_timeout_ms > 0).then(|| Duration::from_millis(self.serial_timeout_ms))
    }
}
