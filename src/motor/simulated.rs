// Stand-in sink for running without a controller attached

use tracing::debug;

use super::sabertooth::SabertoothError;
use super::MotorSink;
use crate::messages::{MotorCommand, MotorId};

/// Logs every command and remembers the sequence
#[derive(Debug, Default)]
pub struct SimulatedSink {
    sent: Vec<MotorCommand>,
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command received so far, in order
    pub fn sent(&self) -> &[MotorCommand] {
        &self.sent
    }

    /// Most recent power for a motor (0 if never commanded)
    pub fn last_power(&self, motor: MotorId) -> i16 {
        self.sent
            .iter()
            .rev()
            .find(|cmd| cmd.motor == motor)
            .map_or(0, |cmd| cmd.power)
    }
}

impl MotorSink for SimulatedSink {
    fn send(&mut self, motor: MotorId, power: i16) -> Result<(), SabertoothError> {
        debug!("[sim] motor {:?} -> {}", motor, power);
        self.sent.push(MotorCommand::new(motor, power));
        Ok(())
    }
}
