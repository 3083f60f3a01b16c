// Motor output for the two-motor base
//
// Provides:
// - Sabertooth packet-serial protocol implementation
// - High-level motor driver (controller bring-up, stop on drop)
// - Simulated sink for running without hardware

mod driver;
pub mod sabertooth;
mod simulated;

pub use driver::MotorDriver;
pub use sabertooth::{Sabertooth, SabertoothError};
pub use simulated::SimulatedSink;

use crate::messages::MotorId;

/// Destination for per-motor power commands
pub trait MotorSink {
    fn send(&mut self, motor: MotorId, power: i16) -> Result<(), SabertoothError>;

    /// Command both motors to zero, left first
    fn stop(&mut self) -> Result<(), SabertoothError> {
        self.send(MotorId::Left, 0)?;
        self.send(MotorId::Right, 0)
    }
}

impl<T: MotorSink + ?Sized> MotorSink for Box<T> {
    fn send(&mut self, motor: MotorId, power: i16) -> Result<(), SabertoothError> {
        (**self).send(motor, power)
    }

    fn stop(&mut self) -> Result<(), SabertoothError> {
        (**self).stop()
    }
}
