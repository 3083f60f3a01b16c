use std::path::PathBuf;

use button_drive_runtime::config::RuntimeConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Drive a two-motor base from four direction buttons
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the motor controller
    #[arg(short, long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Controller packet-serial address (128-135)
    #[arg(long)]
    address: Option<u8>,

    /// Base power for the left motor (0-127)
    #[arg(long)]
    left_power: Option<u8>,

    /// Base power for the right motor (0-127)
    #[arg(long)]
    right_power: Option<u8>,

    #[arg(long)]
    loop_hz: Option<u64>,

    /// Log motor commands instead of opening the serial port
    #[arg(long)]
    simulate: bool,

    /// Replay button frames from a JSON-lines file instead of the keyboard
    #[arg(long)]
    script: Option<PathBuf>,

    /// Controller-side serial watchdog in ms (0 = off)
    #[arg(long)]
    serial_timeout_ms: Option<u64>,

    /// How long a key counts as held without a release event
    #[arg(long)]
    key_hold_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<RuntimeConfig, Box<dyn std::error::Error + Send + Sync>> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::load(path)?,
            None => RuntimeConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(baud) = self.baud {
            config.baudrate = baud;
        }
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(power) = self.left_power {
            config.left_power = power;
        }
        if let Some(power) = self.right_power {
            config.right_power = power;
        }
        if let Some(hz) = self.loop_hz {
            config.loop_hz = hz;
        }
        if self.simulate {
            config.simulate = true;
        }
        if self.script.is_some() {
            config.script = self.script;
        }
        if let Some(ms) = self.serial_timeout_ms {
            config.serial_timeout_ms = ms;
        }
        if let Some(ms) = self.key_hold_ms {
            config.key_hold_ms = ms;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug), on stderr away from the raw-mode terminal
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = button_drive_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
