// Drive decision logic
//
// Provides:
// - Direction resolution (four buttons -> 4-bit direction code)
// - Differential drive mapping (direction code -> left/right power)

pub mod direction;
pub mod mapper;

pub use direction::{resolve, Direction, DirectionCode};
pub use mapper::{drive_powers, map_to_commands, DrivePowers};
