//! Control worker on its own thread, driven through a `ControlHandle`.

use std::time::{Duration, Instant};

use crate::mock_hw::{CollectingSink, ScriptedBridge};

use cryoloop::adapters::clock::SimulatedClock;
use cryoloop::app::service::ControlService;
use cryoloop::config::ControllerConfig;
use cryoloop::error::IoError;
use cryoloop::runtime::{ControlWorker, RunLimits};
use cryoloop::schedule::{Schedule, ScheduleEntry};

fn service(auto_advance: bool) -> ControlService {
    let cfg = ControllerConfig {
        auto_advance,
        noise_std_dev: 0.0,
        ..ControllerConfig::default()
    };
    let schedule = Schedule::new(vec![
        ScheduleEntry::new(300.0, 2.0),
        ScheduleEntry::new(298.0, 2.0),
    ])
    .unwrap();
    ControlService::new(&cfg, schedule).unwrap()
}

fn limits(ticks: u64) -> RunLimits {
    RunLimits {
        max_ticks: Some(ticks),
        max_duration: Some(Duration::from_secs(10)),
    }
}

#[test]
fn command_from_another_thread_reaches_the_loop() {
    let worker = ControlWorker::new(
        service(false),
        ScriptedBridge::constant(300.0),
        CollectingSink::new(),
        SimulatedClock::new(),
    )
    .with_period(Duration::from_millis(2))
    .with_limits(limits(50));

    let (join, handle) = worker.spawn().unwrap();
    assert!(handle.force_advance());
    let summary = join.join().unwrap();

    assert_eq!(summary.ticks, 50);
    assert_eq!(summary.final_snapshot.schedule_index, 1);
    assert_eq!(summary.final_snapshot.target_setpoint, 298.0);
    assert!(!summary.final_snapshot.auto_advance);
}

#[test]
fn snapshots_stream_until_stopped() {
    let worker = ControlWorker::new(
        service(true),
        ScriptedBridge::constant(300.0),
        CollectingSink::new(),
        SimulatedClock::new(),
    )
    .with_period(Duration::from_millis(2));

    let (join, handle) = worker.spawn().unwrap();
    let give_up = Instant::now() + Duration::from_secs(10);
    let mut seen = Vec::new();
    while seen.len() < 5 && Instant::now() < give_up {
        match handle.try_recv_snapshot() {
            Some(s) => seen.push(s),
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    handle.stop();
    let summary = join.join().unwrap();

    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(seen[0].timestamp, 1.0);
    assert!(summary.ticks >= 5);
}

#[test]
fn bridge_faults_are_counted_not_fatal() {
    let bridge = ScriptedBridge::new(300.0)
        .then(300.0, 2)
        .then_fail(IoError::unavailable("link down"), 3);
    let worker = ControlWorker::new(service(true), bridge, CollectingSink::new(), SimulatedClock::new())
        .with_period(Duration::from_millis(1))
        .with_limits(limits(10));

    let (join, _handle) = worker.spawn().unwrap();
    let summary = join.join().unwrap();

    assert_eq!(summary.ticks, 10);
    assert_eq!(summary.bridge_faults, 3);
    assert_eq!(summary.final_snapshot.temperature, 300.0);
}
