//! cryoloop: simulated cryostat regulator.
//!
//! Composition root.  Loads configuration and the setpoint schedule,
//! wires the simulated bridge and sinks to the control service, and runs
//! the control worker until a tick or duration limit is reached.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use cryoloop::adapters::bridge::Bridge;
use cryoloop::adapters::clock::{MonotonicClock, SimulatedClock};
use cryoloop::adapters::config_file::JsonConfigFile;
use cryoloop::adapters::csv_log::CsvHistoryLog;
use cryoloop::adapters::log_sink::LogEventSink;
use cryoloop::adapters::simulated::SimulatedBridge;
use cryoloop::adapters::storage::FileStorage;
use cryoloop::app::ports::{ClockPort, ConfigPort, EventSink};
use cryoloop::app::service::ControlService;
use cryoloop::config::{ControllerConfig, validate};
use cryoloop::runtime::{ControlWorker, RunLimits, RunSummary};
use cryoloop::schedule::{Schedule, load_schedule_file};

#[derive(Parser)]
#[command(name = "cryoloop")]
#[command(version)]
#[command(about = "PID regulation of a simulated cryostat through a setpoint schedule")]
struct Args {
    /// Schedule CSV (`setpoints,...` and `stable_times,...` rows)
    #[arg(long)]
    schedule: Option<PathBuf>,

    /// JSON configuration file; may also embed a `schedule` list
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many control ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Stop after this many seconds of wall time
    #[arg(long)]
    duration_secs: Option<f64>,

    /// Start with automatic advancing disabled
    #[arg(long)]
    manual: bool,

    /// Append telemetry history to this CSV file
    #[arg(long)]
    csv_log: Option<PathBuf>,

    /// Directory for the resume record
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Seed for the sensor noise generator
    #[arg(long)]
    seed: Option<u64>,

    /// Control loop period in milliseconds
    #[arg(long)]
    interval_ms: Option<u32>,

    /// Time stability dwell against the wall clock instead of simulated time
    #[arg(long)]
    wall_clock: bool,

    /// Log one telemetry line every N ticks
    #[arg(long, default_value = "1")]
    log_every: u64,
}

/// Spawn the worker on its own thread and wait for it to finish.
fn run_worker<C>(
    service: ControlService,
    bridge: Bridge,
    sink: impl EventSink + Send + 'static,
    clock: C,
    limits: RunLimits,
    storage: Option<FileStorage>,
) -> Result<RunSummary>
where
    C: ClockPort + Send + 'static,
{
    let mut worker = ControlWorker::new(service, bridge, sink, clock).with_limits(limits);
    if let Some(storage) = storage {
        worker = worker.with_storage(Box::new(storage));
    }
    let (join, _handle) = worker.spawn().context("failed to spawn control worker")?;
    join.join().map_err(|_| anyhow!("control worker panicked"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("cryoloop v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config_file = args.config.as_ref().map(JsonConfigFile::new);
    let mut config = match config_file.as_ref().map(|f| f.load()) {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            warn!("Config load failed ({e}), using defaults");
            ControllerConfig::default()
        }
        None => ControllerConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.noise_seed = Some(seed);
    }
    if let Some(ms) = args.interval_ms {
        config.control_loop_interval_ms = ms;
    }
    if args.manual {
        config.auto_advance = false;
    }
    validate(&config).map_err(|e| anyhow!("invalid configuration: {e}"))?;

    // ── 2. Schedule ───────────────────────────────────────────
    let schedule = match (&args.schedule, &config_file) {
        (Some(path), _) => load_schedule_file(path, config.default_dwell_secs),
        (None, Some(file)) => match file.load_schedule() {
            Ok(Some(schedule)) => schedule,
            Ok(None) => Schedule::builtin(),
            Err(e) => {
                warn!("Embedded schedule unusable ({e}), using default schedule");
                Schedule::builtin()
            }
        },
        (None, None) => Schedule::builtin(),
    };
    info!(
        "Schedule: {}",
        schedule
            .entries()
            .iter()
            .map(|e| format!("{:.2} K/{:.1}s", e.setpoint, e.dwell_time))
            .collect::<Vec<_>>()
            .join(", ")
    );

    // ── 3. Service + resume ───────────────────────────────────
    let mut service = ControlService::new(&config, schedule)
        .map_err(|e| anyhow!("cannot build control service: {e}"))?;

    let storage = match &args.state_dir {
        Some(dir) => {
            let storage = FileStorage::open(dir)
                .map_err(|e| anyhow!("state dir {}: {e}", dir.display()))?;
            if service.restore(&storage) {
                let resume = service.resume_state();
                info!(
                    "Resumed at index {} (auto={})",
                    resume.schedule_index, resume.auto_advance
                );
            }
            Some(storage)
        }
        None => None,
    };

    // ── 4. Adapters ───────────────────────────────────────────
    let bridge = Bridge::from(SimulatedBridge::from_config(&config));
    info!("Bridge: {}", bridge.kind());

    let csv = match &args.csv_log {
        Some(path) => match CsvHistoryLog::open(path) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!("CSV log {} unavailable ({e}), continuing without it", path.display());
                None
            }
        },
        None => None,
    };
    let sink = (LogEventSink::every(args.log_every), csv);

    // ── 5. Run ────────────────────────────────────────────────
    let limits = RunLimits {
        max_ticks: args.ticks,
        max_duration: args.duration_secs.map(Duration::from_secs_f64),
    };
    let summary = if args.wall_clock {
        run_worker(service, bridge, sink, MonotonicClock::new(), limits, storage)?
    } else {
        run_worker(service, bridge, sink, SimulatedClock::new(), limits, storage)?
    };

    let last = summary.final_snapshot;
    info!(
        "Done: {} ticks, {} bridge faults, {} overruns, {} snapshots dropped",
        summary.ticks, summary.bridge_faults, summary.overruns, summary.dropped_snapshots
    );
    info!(
        "Final: T={:.3} K, target={:.2} K, index={}, stable={}",
        last.temperature, last.target_setpoint, last.schedule_index, last.is_stable
    );
    Ok(())
}
