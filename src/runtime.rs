// Fixed-rate control loop: sample buttons -> resolve -> map -> send left, right
// Note: nothing about the drive carries over between cycles; every cycle commands both motors

use std::time::Duration;
use tokio::{signal, time::interval};
use tracing::{debug, info, warn};

// local imports
use crate::config::{DriveConfig, RuntimeConfig};
use crate::drive::{map_to_commands, resolve, Direction, DirectionCode};
use crate::input::{ButtonSampler, InputError, KeyboardSampler, ScriptedSampler};
use crate::messages::{ButtonState, MotorCommand, RuntimeHealth};
use crate::motor::{MotorDriver, MotorSink, SabertoothError, SimulatedSink};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Motor transport error: {0}")]
    Transport(#[from] SabertoothError),

    #[error("Giving up after {0} consecutive failed cycles")]
    TooManyFaults(u32),
}

/// What one cycle decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub buttons: ButtonState,
    pub code: DirectionCode,
    pub left: MotorCommand,
    pub right: MotorCommand,
}

pub struct Runtime<S, M> {
    sampler: S,
    sink: M,
    drive: DriveConfig,
    last_direction: Option<Direction>,
    health: RuntimeHealth,
    consecutive_faults: u32,
    max_consecutive_faults: u32,
}

impl<S: ButtonSampler, M: MotorSink> Runtime<S, M> {
    pub fn new(sampler: S, sink: M, drive: DriveConfig, max_consecutive_faults: u32) -> Self {
        Self {
            sampler,
            sink,
            drive,
            last_direction: None,
            health: RuntimeHealth::Ok,
            consecutive_faults: 0,
            max_consecutive_faults,
        }
    }

    /// Run one cycle; `None` once the input has ended
    pub fn cycle(&mut self) -> Result<Option<CycleReport>, RuntimeError> {
        let Some(buttons) = self.sampler.sample()? else {
            return Ok(None);
        };

        let code = resolve(buttons);
        self.log_direction(code);

        let (left, right) = map_to_commands(code, &self.drive);
        debug!(
            "Code {} -> left={}, right={}",
            code, left.power, right.power
        );

        self.sink.send(left.motor, left.power)?;
        self.sink.send(right.motor, right.power)?;

        Ok(Some(CycleReport {
            buttons,
            code,
            left,
            right,
        }))
    }

    /// Run one cycle and apply the fault policy
    ///
    /// Transport failures are tolerated until `max_consecutive_faults` in a
    /// row; any other error ends the loop. Returns `false` once the input
    /// has ended.
    pub fn tick(&mut self) -> Result<bool, RuntimeError> {
        match self.cycle() {
            Ok(None) => Ok(false),
            Ok(Some(_)) => {
                if self.health != RuntimeHealth::Ok {
                    info!(
                        "Motor link recovered after {} failed cycles",
                        self.consecutive_faults
                    );
                    self.health = RuntimeHealth::Ok;
                }
                self.consecutive_faults = 0;
                Ok(true)
            }
            Err(RuntimeError::Transport(e)) => {
                self.consecutive_faults += 1;
                if self.health != RuntimeHealth::TransportFault {
                    warn!("Motor link fault: {}", e);
                    self.health = RuntimeHealth::TransportFault;
                } else {
                    debug!("Motor link still faulted ({}): {}", self.consecutive_faults, e);
                }

                if self.consecutive_faults >= self.max_consecutive_faults {
                    return Err(RuntimeError::TooManyFaults(self.consecutive_faults));
                }
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort stop of both motors
    pub fn shutdown(&mut self) {
        if let Err(e) = self.sink.stop() {
            warn!("Failed to stop motors on shutdown: {}", e);
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn sink(&self) -> &M {
        &self.sink
    }

    fn log_direction(&mut self, code: DirectionCode) {
        let direction = code.direction();
        if self.last_direction == Some(direction) {
            return;
        }
        match direction {
            Direction::Contradictory => {
                warn!("Contradictory buttons (code {}), stopping", code)
            }
            _ => info!("{}", direction),
        }
        self.last_direction = Some(direction);
    }
}

pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;
    let drive = config.drive()?;

    // Bring the controller up before taking over the terminal
    let sink: Box<dyn MotorSink> = if config.simulate {
        info!("Simulation mode: motor commands are logged, not sent");
        Box::new(SimulatedSink::new())
    } else {
        let mut driver = MotorDriver::open(&config.port, config.baudrate, config.address)?;
        driver.initialize(config.serial_timeout()).await?;
        Box::new(driver)
    };

    let sampler: Box<dyn ButtonSampler> = match &config.script {
        Some(path) => Box::new(ScriptedSampler::load(path)?),
        None => Box::new(KeyboardSampler::new(config.key_hold())?),
    };

    let mut runtime = Runtime::new(sampler, sink, drive, config.max_consecutive_faults);

    info!(
        "Runtime started: {}Hz loop, base power left={}, right={}",
        config.loop_hz, drive.left, drive.right
    );

    drive_loop(&mut runtime, config.loop_period()).await?;
    Ok(())
}

/// Tick `runtime` every `period` until input ends, Ctrl+C, or a fatal error;
/// both motors are stopped on every exit path
pub async fn drive_loop<S: ButtonSampler, M: MotorSink>(
    runtime: &mut Runtime<S, M>,
    period: Duration,
) -> Result<(), RuntimeError> {
    let mut tick = interval(period);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break Ok(());
            }
        }

        match runtime.tick() {
            Ok(true) => {}
            Ok(false) => {
                info!("Input ended");
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    runtime.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MotorId;

    // Sink that fails a set number of sends before recovering
    struct FlakySink {
        failures_left: u32,
        inner: SimulatedSink,
    }

    impl MotorSink for FlakySink {
        fn send(&mut self, motor: MotorId, power: i16) -> Result<(), SabertoothError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(SabertoothError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "unplugged",
                )));
            }
            self.inner.send(motor, power)
        }
    }

    fn runtime_with(frames: Vec<ButtonState>) -> Runtime<ScriptedSampler, SimulatedSink> {
        Runtime::new(
            ScriptedSampler::from_frames(frames),
            SimulatedSink::new(),
            DriveConfig::new(20, 20).unwrap(),
            3,
        )
    }

    #[test]
    fn test_cycle_sends_left_then_right() {
        let mut runtime = runtime_with(vec![ButtonState::new(true, true, false, false)]);
        let report = runtime.cycle().unwrap().unwrap();

        assert_eq!(report.code.bits(), 3);
        assert_eq!(
            runtime.sink().sent(),
            &[
                MotorCommand::new(MotorId::Left, 10),
                MotorCommand::new(MotorId::Right, 20),
            ]
        );
    }

    #[test]
    fn test_contradictory_buttons_stop_motors() {
        let mut runtime = runtime_with(vec![
            ButtonState::new(true, false, false, false),
            ButtonState::new(true, false, true, false),
        ]);
        runtime.cycle().unwrap();
        let report = runtime.cycle().unwrap().unwrap();

        assert_eq!(report.code.bits(), 5);
        // Motors are re-commanded to zero, not left at the previous power
        assert_eq!(runtime.sink().sent().len(), 4);
        assert_eq!(runtime.sink().last_power(MotorId::Left), 0);
        assert_eq!(runtime.sink().last_power(MotorId::Right), 0);
    }

    #[test]
    fn test_script_end_stops_loop() {
        let mut runtime = runtime_with(vec![ButtonState::new(false, false, true, false)]);
        assert!(runtime.tick().unwrap());
        assert!(!runtime.tick().unwrap());

        runtime.shutdown();
        let sent = runtime.sink().sent();
        assert_eq!(sent[0], MotorCommand::new(MotorId::Left, -20));
        assert_eq!(sent[1], MotorCommand::new(MotorId::Right, -20));
        assert_eq!(&sent[2..], &[
            MotorCommand::stopped(MotorId::Left),
            MotorCommand::stopped(MotorId::Right),
        ]);
    }

    #[test]
    fn test_transport_faults_then_recovery() {
        let sink = FlakySink {
            failures_left: 2,
            inner: SimulatedSink::new(),
        };
        let frames = vec![ButtonState::new(true, false, false, false); 3];
        let mut runtime = Runtime::new(
            ScriptedSampler::from_frames(frames),
            sink,
            DriveConfig::new(20, 20).unwrap(),
            3,
        );

        assert!(runtime.tick().unwrap());
        assert_eq!(runtime.health(), RuntimeHealth::TransportFault);
        assert!(runtime.tick().unwrap());
        assert!(runtime.tick().unwrap());
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert_eq!(runtime.sink().inner.sent().len(), 2);
    }

    #[test]
    fn test_too_many_faults() {
        let sink = FlakySink {
            failures_left: u32::MAX,
            inner: SimulatedSink::new(),
        };
        let frames = vec![ButtonState::default(); 5];
        let mut runtime = Runtime::new(
            ScriptedSampler::from_frames(frames),
            sink,
            DriveConfig::default(),
            3,
        );

        assert!(runtime.tick().unwrap());
        assert!(runtime.tick().unwrap());
        assert!(matches!(runtime.tick(), Err(RuntimeError::TooManyFaults(3))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_loop_stops_motors_when_script_ends() {
        let mut runtime = runtime_with(vec![
            ButtonState::new(true, false, false, false),
            ButtonState::new(false, false, false, true),
        ]);
        drive_loop(&mut runtime, Duration::from_millis(20))
            .await
            .unwrap();

        assert_eq!(
            runtime.sink().sent(),
            &[
                MotorCommand::new(MotorId::Left, 20),
                MotorCommand::new(MotorId::Right, 20),
                MotorCommand::new(MotorId::Left, 20),
                MotorCommand::stopped(MotorId::Right),
                MotorCommand::stopped(MotorId::Left),
                MotorCommand::stopped(MotorId::Right),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_loop_stops_motors_after_fault_limit() {
        let sink = FlakySink {
            failures_left: 3,
            inner: SimulatedSink::new(),
        };
        let frames = vec![ButtonState::new(true, false, false, false); 10];
        let mut runtime = Runtime::new(
            ScriptedSampler::from_frames(frames),
            sink,
            DriveConfig::default(),
            3,
        );

        let err = drive_loop(&mut runtime, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::TooManyFaults(3)));
        // The link is back by shutdown, so only the stop commands got through
        assert_eq!(
            runtime.sink().inner.sent(),
            &[
                MotorCommand::stopped(MotorId::Left),
                MotorCommand::stopped(MotorId::Right),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_simulated_script() {
        let path = std::env::temp_dir().join(format!(
            "button-drive-runtime-{}.jsonl",
            std::process::id()
        ));
        std::fs::write(&path, "{\"forward\": true, \"right\": true}\n{}\n").unwrap();

        let config = RuntimeConfig {
            simulate: true,
            script: Some(path.clone()),
            loop_hz: 1000,
            ..Default::default()
        };
        let result = run(config).await;
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_ok(), "run failed: {:?}", result);
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let config = RuntimeConfig {
            simulate: true,
            loop_hz: 5000,
            ..Default::default()
        };
        assert!(run(config).await.is_err());
    }
}
