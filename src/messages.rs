// Value types passed through one control cycle

use serde::{Deserialize, Serialize};

// Buttons sampled this cycle (true = pressed)
// Missing fields in a script frame count as released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonState {
    pub forward: bool,
    pub right: bool,
    pub reverse: bool,
    pub left: bool,
}

impl ButtonState {
    pub fn new(forward: bool, right: bool, reverse: bool, left: bool) -> Self {
        Self {
            forward,
            right,
            reverse,
            left,
        }
    }

    /// Decode raw pin levels from pulled-up switches wired to ground.
    ///
    /// `levels` is `[forward, right, reverse, left]`; a high level (true)
    /// means the switch is open, i.e. released.
    pub fn from_active_low(levels: [bool; 4]) -> Self {
        let [forward, right, reverse, left] = levels.map(|high| !high);
        Self::new(forward, right, reverse, left)
    }

    pub fn any_pressed(&self) -> bool {
        self.forward || self.right || self.reverse || self.left
    }
}

/// Motor channel on the dual controller
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorId {
    Left = 1,
    Right = 2,
}

impl MotorId {
    /// Channel number as printed on the controller terminals (M1 / M2)
    pub fn channel(self) -> u8 {
        self as u8
    }
}

// Signed power for one motor (positive = forward)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub motor: MotorId,
    pub power: i16,
}

impl MotorCommand {
    pub fn new(motor: MotorId, power: i16) -> Self {
        Self { motor, power }
    }

    pub fn stopped(motor: MotorId) -> Self {
        Self::new(motor, 0)
    }
}

/// Health of the motor link as seen by the control loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuntimeHealth {
    Ok,
    TransportFault,
}
