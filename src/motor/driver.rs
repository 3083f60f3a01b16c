// High-level motor driver for the two-motor base
//
// Wraps the Sabertooth protocol behind the MotorSink interface used by the
// control loop and handles controller bring-up.

use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::sabertooth::{
    Sabertooth, SabertoothError, AUTOBAUD_LEAD_IN, AUTOBAUD_SETTLE, POWER_UP_DELAY,
};
use super::MotorSink;
use crate::messages::MotorId;

/// High-level driver for the dual-channel controller
pub struct MotorDriver<W: Write> {
    controller: Sabertooth<W>,
}

impl MotorDriver<Box<dyn SerialPort>> {
    /// Open the serial link to the controller
    pub fn open(port: &str, baudrate: u32, address: u8) -> Result<Self, SabertoothError> {
        info!(
            "Opening motor controller on {} ({} baud, address {})",
            port, baudrate, address
        );
        let controller = Sabertooth::open_with_baudrate(port, baudrate, address)?;
        Ok(Self::new(controller))
    }
}

impl<W: Write> MotorDriver<W> {
    pub fn new(controller: Sabertooth<W>) -> Self {
        Self { controller }
    }

    /// Bring the controller up: wait for power-up, autobaud, optional serial
    /// timeout, then command both motors to zero.
    ///
    /// This must be called before sending power commands.
    pub async fn initialize(
        &mut self,
        serial_timeout: Option<Duration>,
    ) -> Result<(), SabertoothError> {
        info!("Initializing motor controller {}", self.controller.address());

        sleep(POWER_UP_DELAY + AUTOBAUD_LEAD_IN).await;
        self.controller.autobaud()?;
        sleep(AUTOBAUD_SETTLE).await;

        if let Some(timeout) = serial_timeout {
            info!("Controller serial timeout: {}ms", timeout.as_millis());
            self.controller.set_serial_timeout(timeout)?;
        }

        self.controller.stop()?;
        info!("Motor controller initialized");
        Ok(())
    }

    /// Access the protocol layer
    pub fn controller(&self) -> &Sabertooth<W> {
        &self.controller
    }
}

impl<W: Write> MotorSink for MotorDriver<W> {
    fn send(&mut self, motor: MotorId, power: i16) -> Result<(), SabertoothError> {
        self.controller.motor(motor, power)
    }

    fn stop(&mut self) -> Result<(), SabertoothError> {
        info!("Stopping all motors");
        self.controller.stop()
    }
}

impl<W: Write> Drop for MotorDriver<W> {
    fn drop(&mut self) {
        // Try to stop motors when driver is dropped
        if let Err(e) = self.controller.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
