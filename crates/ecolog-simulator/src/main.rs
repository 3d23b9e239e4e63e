//! Desktop simulator for the ecolog telemetry node.
//!
//! Runs the real acquisition scheduler against synthetic sensors, a
//! directory-backed log and a modem that acknowledges every command. Time is
//! virtual: the simulator steps the uptime counter instead of sleeping, so
//! hours of node time finish in moments.
//!
//! ```text
//! ecolog-simulator --out-dir ./sim --duration-mins 120
//! RUST_LOG=debug ecolog-simulator --config node.toml --fail-every 7
//! ```

mod devices;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use embassy_futures::block_on;
use log::{error, info};

use ecolog_core::app_state::{RunState, bring_up};
use ecolog_core::config::NodeConfig;
use ecolog_core::radio::RadioSession;
use ecolog_core::sensors::SensorHub;

use devices::{
    DirectoryStore, EchoModem, PowerSwitch, SyntheticClimate, SyntheticLight, VirtualClock,
    VirtualDelay, VirtualTime, prepare_output_dir,
};

#[derive(Debug, Parser)]
#[command(name = "ecolog-simulator", version, about)]
struct Cli {
    /// Directory that receives the CSV log
    #[arg(short, long, default_value = "ecolog-sim")]
    out_dir: PathBuf,

    /// Node time to simulate, in minutes
    #[arg(short, long, default_value_t = 60)]
    duration_mins: u64,

    /// TOML file overriding the default node configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial value of the uptime counter (use values near u32::MAX to
    /// exercise counter wraparound)
    #[arg(long, default_value_t = 0)]
    start_elapsed_ms: u32,

    /// Virtual milliseconds between scheduler passes
    #[arg(long, default_value_t = 1_000)]
    step_ms: u64,

    /// Wall-clock start as Unix seconds [default: now]
    #[arg(long)]
    start_unix: Option<u64>,

    /// Make every n-th climate read fail
    #[arg(long)]
    fail_every: Option<u32>,
}

fn load_config(path: Option<&PathBuf>) -> Result<NodeConfig> {
    let Some(path) = path else {
        return Ok(NodeConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn run(cli: Cli) -> Result<RunState> {
    let config = load_config(cli.config.as_ref())?;
    prepare_output_dir(&cli.out_dir)
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;

    let start_unix = match cli.start_unix {
        Some(secs) => secs,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before 1970")?
            .as_secs(),
    };

    let time = VirtualTime::default();
    let modem = EchoModem::new();
    let transmissions = modem.transmissions();

    let hub = SensorHub::new(
        SyntheticClimate::new(time.clone(), start_unix, cli.fail_every),
        SyntheticLight::new(time.clone(), start_unix),
        VirtualClock::new(time.clone(), start_unix),
    );
    let radio = RadioSession::new(
        modem,
        PowerSwitch,
        VirtualDelay(time.clone()),
        config.radio.clone(),
    );
    let store = DirectoryStore::new(&cli.out_dir);

    let startup = block_on(bring_up(&config, hub, store, radio, || {
        time.uptime(cli.start_elapsed_ms)
    }));
    let run_state = RunState::after_startup(&startup);
    let mut node = match startup {
        Ok(node) => node,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Ok(run_state);
        }
    };

    let end_ms = time.now_ms() + cli.duration_mins * 60_000;
    let mut samples = 0u32;
    while time.now_ms() < end_ms {
        time.advance(cli.step_ms.max(1));
        let outcome = block_on(node.run_pass(time.uptime(cli.start_elapsed_ms)));
        if outcome.sampled {
            samples += 1;
        }
    }

    info!(
        "Simulated {} min: {} samples, {} transmissions, {} still accumulated",
        cli.duration_mins,
        samples,
        transmissions.borrow().len(),
        node.accumulator().len()
    );
    info!(
        "Log written to {}",
        cli.out_dir.join(&config.storage.log_file).display()
    );
    Ok(run_state)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(RunState::Running) => ExitCode::SUCCESS,
        Ok(state) => {
            error!("Node ended in state {:?}", state);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
