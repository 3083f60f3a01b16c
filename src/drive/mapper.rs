// Differential drive mapping for the two-motor base
// Converts a direction code into one signed power command per side.

use crate::config::DriveConfig;
use crate::messages::{MotorCommand, MotorId};

use super::direction::{Direction, DirectionCode};

/// Power pair for one cycle, always sent left then right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivePowers {
    pub left: i16,
    pub right: i16,
}

impl DrivePowers {
    pub fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn commands(self) -> (MotorCommand, MotorCommand) {
        (
            MotorCommand::new(MotorId::Left, self.left),
            MotorCommand::new(MotorId::Right, self.right),
        )
    }
}

/// Compute the side powers for a drive state
///
/// Pivots stop the inner side, diagonals halve it (integer division,
/// truncating toward zero). Contradictory codes stop both sides.
pub fn drive_powers(direction: Direction, config: &DriveConfig) -> DrivePowers {
    let left = i16::from(config.left);
    let right = i16::from(config.right);

    match direction {
        Direction::Stop | Direction::Contradictory => DrivePowers::zero(),
        Direction::Forward => DrivePowers::new(left, right),
        Direction::Right => DrivePowers::new(0, right),
        Direction::ForwardRight => DrivePowers::new(left / 2, right),
        Direction::Back => DrivePowers::new(-left, -right),
        Direction::BackRight => DrivePowers::new(-left / 2, -right),
        Direction::Left => DrivePowers::new(left, 0),
        Direction::ForwardLeft => DrivePowers::new(left, right / 2),
        Direction::BackLeft => DrivePowers::new(-left, -right / 2),
    }
}

/// Map a direction code to the (left, right) motor commands
pub fn map_to_commands(code: DirectionCode, config: &DriveConfig) -> (MotorCommand, MotorCommand) {
    drive_powers(code.direction(), config).commands()
}
