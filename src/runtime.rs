//! Dedicated control worker.
//!
//! The worker thread exclusively owns the bridge; everything else talks
//! to it through [`ControlChannels`]:
//!
//! ```text
//! ┌──────────────┐  AppCommand       ┌─────────────────┐
//! │  UI / CLI    │──────────────────▶│  control worker │
//! │  threads     │◀──────────────────│  (owns bridge)  │
//! └──────────────┘  ControlSnapshot  └─────────────────┘
//!                   + stop flag
//! ```
//!
//! Commands are drained at tick boundaries only.  Snapshots are sent
//! with `try_send`; when the consumer falls behind the oldest queued
//! snapshot is shed, never waited on, so the newest state is always
//! readable.  Ticks run at a fixed rate (`start + k·period`); an overrun
//! re-bases the schedule instead of bursting to catch up.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{debug, info, warn};

use crate::app::commands::AppCommand;
use crate::app::events::{AppEvent, ControlSnapshot};
use crate::app::ports::{ClockPort, EventSink, HardwareBridge, StoragePort};
use crate::app::service::ControlService;

/// Channel depth for operator commands (inbound).
pub const COMMAND_QUEUE_DEPTH: usize = 8;

/// Channel depth for published snapshots (outbound).
pub const SNAPSHOT_QUEUE_DEPTH: usize = 16;

/// Longest uninterrupted sleep; bounds cancellation latency.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

// ───────────────────────────────────────────────────────────────
// Shared channels
// ───────────────────────────────────────────────────────────────

pub struct ControlChannels {
    commands: Channel<CriticalSectionRawMutex, AppCommand, COMMAND_QUEUE_DEPTH>,
    snapshots: Channel<CriticalSectionRawMutex, ControlSnapshot, SNAPSHOT_QUEUE_DEPTH>,
    stop: AtomicBool,
}

impl ControlChannels {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            snapshots: Channel::new(),
            stop: AtomicBool::new(false),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Publish a snapshot without blocking.  A full queue sheds its oldest
    /// entry, so the newest snapshot is always the last one queued.
    /// Returns `true` if an older snapshot was discarded.
    fn publish(&self, snapshot: ControlSnapshot) -> bool {
        let Err(TrySendError::Full(snapshot)) = self.snapshots.try_send(snapshot) else {
            return false;
        };
        let shed = self.snapshots.try_receive().is_ok();
        if self.snapshots.try_send(snapshot).is_err() {
            warn!("Snapshot queue refilled concurrently; dropped newest");
        }
        shed
    }
}

impl Default for ControlChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle for threads other than the worker.
#[derive(Clone)]
pub struct ControlHandle {
    shared: Arc<ControlChannels>,
}

impl ControlHandle {
    pub fn new(shared: Arc<ControlChannels>) -> Self {
        Self { shared }
    }

    /// Queue a command for the next tick.  Returns `false` if the queue is full.
    pub fn send(&self, cmd: AppCommand) -> bool {
        if self.shared.commands.try_send(cmd).is_err() {
            warn!("Command queue full; dropped {cmd:?}");
            return false;
        }
        true
    }

    pub fn set_auto_mode(&self, enabled: bool) -> bool {
        self.send(AppCommand::SetAutoMode(enabled))
    }

    pub fn request_advance(&self) -> bool {
        self.send(AppCommand::RequestAdvance)
    }

    pub fn force_advance(&self) -> bool {
        self.send(AppCommand::ForceAdvance)
    }

    /// Ask the worker to shut down after the current tick.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested()
    }

    pub fn try_recv_snapshot(&self) -> Option<ControlSnapshot> {
        self.shared.snapshots.try_receive().ok()
    }

    /// Drain the queue and keep only the newest snapshot.
    pub fn latest_snapshot(&self) -> Option<ControlSnapshot> {
        let mut latest = None;
        while let Some(s) = self.try_recv_snapshot() {
            latest = Some(s);
        }
        latest
    }
}

// ───────────────────────────────────────────────────────────────
// Worker
// ───────────────────────────────────────────────────────────────

/// Optional stop conditions besides the stop flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    pub max_ticks: Option<u64>,
    pub max_duration: Option<Duration>,
}

/// What the worker reports when it exits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub bridge_faults: u64,
    pub overruns: u64,
    pub dropped_snapshots: u64,
    pub final_snapshot: ControlSnapshot,
}

pub struct ControlWorker<B, S, C> {
    service: ControlService,
    bridge: B,
    sink: S,
    clock: C,
    storage: Option<Box<dyn StoragePort + Send>>,
    period: Duration,
    limits: RunLimits,
}

impl<B, S, C> ControlWorker<B, S, C>
where
    B: HardwareBridge + Send + 'static,
    S: EventSink + Send + 'static,
    C: ClockPort + Send + 'static,
{
    pub fn new(service: ControlService, bridge: B, sink: S, clock: C) -> Self {
        let period = Duration::from_secs_f64(service.dt());
        Self {
            service,
            bridge,
            sink,
            clock,
            storage: None,
            period,
            limits: RunLimits::default(),
        }
    }

    /// Persist the resume record here on every transition.
    pub fn with_storage(mut self, storage: Box<dyn StoragePort + Send>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Override the wall-clock period (the control `dt` is unchanged).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Run on a new thread named `control`.
    pub fn spawn(self) -> io::Result<(JoinHandle<RunSummary>, ControlHandle)> {
        let shared = Arc::new(ControlChannels::new());
        let handle = ControlHandle::new(Arc::clone(&shared));
        let join = thread::Builder::new()
            .name("control".into())
            .spawn(move || self.run(&shared))?;
        Ok((join, handle))
    }

    /// Run the loop on the calling thread until stopped or a limit is hit.
    pub fn run(mut self, shared: &ControlChannels) -> RunSummary {
        info!(
            "Control worker started: period {} ms, dt {:.3}s",
            self.period.as_millis(),
            self.service.dt()
        );
        self.service.start(&mut self.bridge, &mut self.sink);

        let started = Instant::now();
        let mut deadline = started;
        let mut ticks = 0u64;
        let mut overruns = 0u64;
        let mut dropped = 0u64;

        loop {
            if shared.stop_requested() {
                info!("Stop requested");
                break;
            }
            if self.limits.max_ticks.is_some_and(|max| ticks >= max) {
                info!("Tick limit reached ({ticks})");
                break;
            }
            if self
                .limits
                .max_duration
                .is_some_and(|max| started.elapsed() >= max)
            {
                info!("Run duration reached");
                break;
            }

            // Commands apply at the tick boundary, in arrival order.
            while let Ok(cmd) = shared.commands.try_receive() {
                self.service
                    .handle_command(cmd, &mut self.bridge, &mut self.sink);
            }

            self.clock.on_tick(self.service.dt());
            let now = self.clock.now_secs();
            let report = self.service.tick(&mut self.bridge, &mut self.sink, now);
            ticks += 1;

            if let Some(storage) = self.storage.as_mut() {
                self.service.save_resume_if_dirty(storage);
            }

            if shared.publish(report.snapshot) {
                dropped += 1;
                debug!("Snapshot queue full; shed oldest at tick {ticks}");
            }

            deadline += self.period;
            let now = Instant::now();
            if now > deadline {
                overruns += 1;
                warn!(
                    "Tick {ticks} overran its period by {} ms",
                    (now - deadline).as_millis()
                );
                deadline = now;
            } else if !sleep_until(deadline, &shared.stop) {
                info!("Stop requested");
                break;
            }
        }

        self.shutdown(ticks, overruns, dropped)
    }

    fn shutdown(mut self, ticks: u64, overruns: u64, dropped: u64) -> RunSummary {
        if let Err(e) = self.bridge.shutdown() {
            warn!("Bridge shutdown failed: {e}");
        }
        if let Some(storage) = self.storage.as_mut() {
            self.service.save_resume_if_dirty(storage);
        }
        self.sink.emit(&AppEvent::Stopped);
        info!("Control worker stopped after {ticks} ticks");

        RunSummary {
            ticks,
            bridge_faults: self.service.fault_count(),
            overruns,
            dropped_snapshots: dropped,
            final_snapshot: self.service.snapshot(),
        }
    }
}

/// Sleep until `deadline` in short slices.  Returns `false` if `stop` was
/// raised first.
fn sleep_until(deadline: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
    }
}
