//! Integration tests for the ControlService → StabilityScheduler → bridge
//! pipeline.
//!
//! Time is driven by hand (`now = tick index`, `dt = 1 s`) so every
//! stability deadline is exact.

use crate::mock_hw::{BridgeCall, CollectingSink, ScriptedBridge};

use cryoloop::adapters::simulated::SimulatedBridge;
use cryoloop::adapters::storage::MemoryStorage;
use cryoloop::app::commands::AppCommand;
use cryoloop::app::events::AppEvent;
use cryoloop::app::ports::StoragePort;
use cryoloop::app::resume::{RESUME_KEY, RESUME_NAMESPACE};
use cryoloop::app::service::ControlService;
use cryoloop::config::{ControllerConfig, EndOfSchedule};
use cryoloop::error::{IoError, IoErrorKind};
use cryoloop::fsm::StateId;
use cryoloop::schedule::{Schedule, ScheduleEntry};

fn config(auto_advance: bool) -> ControllerConfig {
    ControllerConfig {
        auto_advance,
        noise_std_dev: 0.0,
        stability_threshold_k: 0.5,
        control_loop_interval_ms: 1000,
        ..ControllerConfig::default()
    }
}

fn schedule(entries: &[(f64, f64)]) -> Schedule {
    Schedule::new(
        entries
            .iter()
            .map(|&(sp, dw)| ScheduleEntry::new(sp, dw))
            .collect(),
    )
    .unwrap()
}

fn make_service(cfg: &ControllerConfig, entries: &[(f64, f64)]) -> (ControlService, CollectingSink) {
    let service = ControlService::new(cfg, schedule(entries)).unwrap();
    (service, CollectingSink::new())
}

/// Run ticks `from..=to`, using the tick index as the timestamp.
fn run(
    service: &mut ControlService,
    bridge: &mut ScriptedBridge,
    sink: &mut CollectingSink,
    from: u32,
    to: u32,
) {
    for k in from..=to {
        service.tick(bridge, sink, f64::from(k));
    }
}

// ── Round trip through two setpoints ──────────────────────────

#[test]
fn auto_mode_advances_after_dwell_and_resets_integral() {
    let cfg = config(true);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0), (295.0, 5.0)]);
    let mut bridge = ScriptedBridge::constant(300.0);
    service.start(&mut bridge, &mut sink);

    // Enters the band at t=1; dwell of 5 s is met at t=6.
    run(&mut service, &mut bridge, &mut sink, 1, 5);
    assert_eq!(service.state(), StateId::Stabilizing);
    assert_eq!(service.current_target(), 300.0);
    assert_eq!(bridge.resets(), 0);

    run(&mut service, &mut bridge, &mut sink, 6, 6);
    assert_eq!(service.scheduler().cursor().index, 1);
    assert_eq!(service.current_target(), 295.0);
    assert_eq!(service.state(), StateId::Unstable);
    assert!(!service.snapshot().is_stable);
    assert_eq!(bridge.resets(), 1, "integral reset in the same tick as the advance");
    assert_eq!(sink.stabilized(), vec![(0, 300.0)]);
    assert_eq!(sink.setpoint_changes(), vec![(0, 1, 295.0)]);

    // The reset lands before the first advance toward the new target.
    run(&mut service, &mut bridge, &mut sink, 7, 7);
    let reset_at = bridge
        .calls
        .iter()
        .position(|c| *c == BridgeCall::ResetControlState)
        .unwrap();
    assert_eq!(
        bridge.calls[reset_at + 1],
        BridgeCall::Advance {
            target: 295.0,
            dt: 1.0
        }
    );
    let targets = bridge.targets();
    assert!(targets[..6].iter().all(|&t| t == 300.0));
    assert_eq!(targets[6], 295.0);
}

#[test]
fn terminal_entry_holds_and_reports_completion_once() {
    let cfg = config(true);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0), (295.0, 5.0)]);
    let mut bridge = ScriptedBridge::new(300.0).then(300.0, 6).then(295.0, 30);
    service.start(&mut bridge, &mut sink);

    // 295 K enters the band at t=7 and is stable at t=12.
    run(&mut service, &mut bridge, &mut sink, 1, 30);

    assert_eq!(service.scheduler().cursor().index, 1);
    assert_eq!(service.state(), StateId::StableWaiting);
    assert!(service.snapshot().is_stable);
    assert_eq!(service.snapshot().stable_duration, 23.0);
    assert_eq!(service.next_target(), None);
    assert_eq!(bridge.resets(), 1);

    let complete: Vec<_> = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::ScheduleComplete { .. }))
        .collect();
    assert_eq!(complete, vec![&AppEvent::ScheduleComplete { index: 1 }]);
    assert_eq!(sink.stabilized(), vec![(0, 300.0), (1, 295.0)]);
}

#[test]
fn wrap_policy_cycles_back_to_first_setpoint() {
    let cfg = ControllerConfig {
        end_of_schedule: EndOfSchedule::Wrap,
        ..config(true)
    };
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 2.0), (295.0, 2.0)]);
    let mut bridge = ScriptedBridge::new(300.0).then(300.0, 3).then(295.0, 3);
    service.start(&mut bridge, &mut sink);

    run(&mut service, &mut bridge, &mut sink, 1, 6);

    assert_eq!(
        sink.setpoint_changes(),
        vec![(0, 1, 295.0), (1, 0, 300.0)]
    );
    assert_eq!(service.current_target(), 300.0);
    assert_eq!(bridge.resets(), 2);
    assert!(!sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::ScheduleComplete { .. })));
}

// ── Stability timing ──────────────────────────────────────────

#[test]
fn leaving_band_restarts_the_dwell() {
    let cfg = config(false);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0)]);
    let mut bridge = ScriptedBridge::new(300.0)
        .then(300.0, 3)
        .then(300.6, 1)
        .then(300.2, 10);
    service.start(&mut bridge, &mut sink);

    run(&mut service, &mut bridge, &mut sink, 1, 4);
    assert_eq!(service.state(), StateId::Unstable);
    assert_eq!(service.scheduler().timer().stabilization_start, None);

    // Re-enters at t=5, so stable at t=10 and not before.
    run(&mut service, &mut bridge, &mut sink, 5, 9);
    assert!(!service.snapshot().is_stable);
    run(&mut service, &mut bridge, &mut sink, 10, 10);
    assert!(service.snapshot().is_stable);
    assert_eq!(service.state(), StateId::StableWaiting);
}

#[test]
fn band_edge_counts_as_in_band() {
    let cfg = config(false);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 2.0)]);
    let mut bridge = ScriptedBridge::constant(300.5);
    service.start(&mut bridge, &mut sink);

    run(&mut service, &mut bridge, &mut sink, 1, 3);
    assert!(service.snapshot().is_stable);
}

// ── Manual mode ───────────────────────────────────────────────

#[test]
fn manual_mode_waits_for_request() {
    let cfg = config(false);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0)]);
    let mut bridge = ScriptedBridge::constant(300.0);
    service.start(&mut bridge, &mut sink);

    run(&mut service, &mut bridge, &mut sink, 1, 20);
    assert_eq!(service.state(), StateId::StableWaiting);
    assert_eq!(service.scheduler().cursor().index, 0);
    assert_eq!(service.next_target(), Some(298.0));

    service.handle_command(AppCommand::RequestAdvance, &mut bridge, &mut sink);
    assert_eq!(service.scheduler().cursor().index, 0, "applies on the next tick");

    run(&mut service, &mut bridge, &mut sink, 21, 21);
    assert_eq!(service.scheduler().cursor().index, 1);
    assert_eq!(service.state(), StateId::Unstable);
    assert!(!service.scheduler().update_requested());
    assert_eq!(bridge.resets(), 1);
}

#[test]
fn early_request_is_held_until_stable_and_counts_once() {
    let cfg = config(false);
    let (mut service, mut sink) =
        make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0), (295.0, 5.0)]);
    let mut bridge = ScriptedBridge::constant(300.0);
    service.start(&mut bridge, &mut sink);

    service.handle_command(AppCommand::RequestAdvance, &mut bridge, &mut sink);
    service.handle_command(AppCommand::RequestAdvance, &mut bridge, &mut sink);

    run(&mut service, &mut bridge, &mut sink, 1, 5);
    assert_eq!(service.scheduler().cursor().index, 0);
    assert!(service.scheduler().update_requested());

    run(&mut service, &mut bridge, &mut sink, 6, 30);
    assert_eq!(service.scheduler().cursor().index, 1);
    assert_eq!(sink.setpoint_changes(), vec![(0, 1, 298.0)]);
}

#[test]
fn force_advance_moves_immediately_in_manual_mode() {
    let cfg = config(false);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0)]);
    let mut bridge = ScriptedBridge::constant(250.0);
    service.start(&mut bridge, &mut sink);
    run(&mut service, &mut bridge, &mut sink, 1, 3);

    service.handle_command(AppCommand::ForceAdvance, &mut bridge, &mut sink);

    assert_eq!(service.current_target(), 298.0);
    assert_eq!(service.state(), StateId::Unstable);
    assert_eq!(bridge.resets(), 1);
    assert_eq!(sink.setpoint_changes(), vec![(0, 1, 298.0)]);
    assert!(service.is_resume_dirty());
}

#[test]
fn force_advance_is_ignored_in_auto_mode() {
    let cfg = config(true);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0)]);
    let mut bridge = ScriptedBridge::constant(250.0);
    service.start(&mut bridge, &mut sink);

    service.handle_command(AppCommand::ForceAdvance, &mut bridge, &mut sink);

    assert_eq!(service.current_target(), 300.0);
    assert_eq!(bridge.resets(), 0);
    assert!(sink.setpoint_changes().is_empty());
}

#[test]
fn switching_to_auto_advances_a_waiting_plant() {
    let cfg = config(false);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 2.0), (298.0, 2.0)]);
    let mut bridge = ScriptedBridge::constant(300.0);
    service.start(&mut bridge, &mut sink);
    run(&mut service, &mut bridge, &mut sink, 1, 5);
    assert_eq!(service.state(), StateId::StableWaiting);

    service.handle_command(AppCommand::SetAutoMode(true), &mut bridge, &mut sink);
    assert!(service.snapshot().auto_advance);
    run(&mut service, &mut bridge, &mut sink, 6, 6);
    assert_eq!(service.current_target(), 298.0);
}

// ── Bridge faults ─────────────────────────────────────────────

#[test]
fn bridge_fault_publishes_last_temperature_and_skips_evaluation() {
    let cfg = config(true);
    let (mut service, mut sink) = make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0)]);
    let err = IoError::new(IoErrorKind::Timeout, "no reply");
    let mut bridge = ScriptedBridge::new(300.0)
        .then(300.1, 2)
        .then_fail(err, 3)
        .then(300.1, 10);
    service.start(&mut bridge, &mut sink);

    run(&mut service, &mut bridge, &mut sink, 1, 2);
    assert_eq!(service.state(), StateId::Stabilizing);

    for k in 3..=5 {
        let report = service.tick(&mut bridge, &mut sink, f64::from(k));
        assert_eq!(report.fault, Some(err));
        assert_eq!(report.snapshot.temperature, 300.1);
        assert_eq!(report.snapshot.timestamp, f64::from(k));
        assert_eq!(service.state(), StateId::Stabilizing);
    }
    assert_eq!(service.fault_count(), 3);
    assert_eq!(sink.faults(), 3);

    // The timer kept its t=1 origin through the faults.
    run(&mut service, &mut bridge, &mut sink, 6, 6);
    assert_eq!(service.current_target(), 298.0);
    assert_eq!(sink.telemetry_count(), 6);
}

#[test]
fn failed_initial_read_falls_back_to_configured_temperature() {
    struct DeadBridge;
    impl cryoloop::app::ports::HardwareBridge for DeadBridge {
        fn read_temperature(&mut self) -> Result<f64, IoError> {
            Err(IoError::unavailable("unplugged"))
        }
        fn advance(&mut self, _target: f64, _dt: f64) -> Result<f64, IoError> {
            Err(IoError::unavailable("unplugged"))
        }
    }

    let cfg = ControllerConfig {
        initial_temperature_k: 77.0,
        ..config(true)
    };
    let (mut service, mut sink) = make_service(&cfg, &[(77.0, 1.0)]);
    let mut bridge = DeadBridge;
    service.start(&mut bridge, &mut sink);
    let report = service.tick(&mut bridge, &mut sink, 1.0);

    assert_eq!(report.snapshot.temperature, 77.0);
    assert_eq!(service.state(), StateId::Unstable);
    assert_eq!(sink.faults(), 2);
}

// ── Resume ────────────────────────────────────────────────────

#[test]
fn resume_record_restores_cursor_but_not_mode() {
    let cfg = config(false);
    let entries = [(300.0, 5.0), (298.0, 5.0), (295.0, 5.0)];
    let (mut service, mut sink) = make_service(&cfg, &entries);
    let mut bridge = ScriptedBridge::constant(300.0);
    let mut storage = MemoryStorage::new();
    service.start(&mut bridge, &mut sink);

    assert!(!service.save_resume_if_dirty(&mut storage));
    service.handle_command(AppCommand::ForceAdvance, &mut bridge, &mut sink);
    service.handle_command(AppCommand::ForceAdvance, &mut bridge, &mut sink);
    assert!(service.save_resume_if_dirty(&mut storage));
    assert!(!service.is_resume_dirty());

    let (mut restarted, _) = make_service(&config(true), &entries);
    assert!(restarted.restore(&storage));
    assert_eq!(restarted.current_target(), 295.0);
    assert!(restarted.snapshot().auto_advance, "configured mode wins");
    assert_eq!(restarted.state(), StateId::Unstable);
}

#[test]
fn resume_record_for_longer_schedule_is_ignored() {
    let cfg = config(false);
    let (mut service, mut sink) =
        make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0), (295.0, 5.0)]);
    let mut bridge = ScriptedBridge::constant(300.0);
    let mut storage = MemoryStorage::new();
    service.handle_command(AppCommand::ForceAdvance, &mut bridge, &mut sink);
    service.handle_command(AppCommand::ForceAdvance, &mut bridge, &mut sink);
    service.save_resume_if_dirty(&mut storage);

    let (mut shorter, _) = make_service(&cfg, &[(300.0, 5.0)]);
    assert!(!shorter.restore(&storage));
    assert_eq!(shorter.current_target(), 300.0);
}

#[test]
fn corrupted_resume_record_is_ignored() {
    let mut storage = MemoryStorage::new();
    storage
        .write(RESUME_NAMESPACE, RESUME_KEY, &[0xff, 0xff, 0xff])
        .unwrap();
    let (mut service, _) = make_service(&config(true), &[(300.0, 5.0), (298.0, 5.0)]);
    assert!(!service.restore(&storage));
    assert_eq!(service.scheduler().cursor().index, 0);
}

// ── Simulated plant end to end ────────────────────────────────

#[test]
fn simulated_plant_walks_the_whole_schedule() {
    let cfg = ControllerConfig {
        noise_seed: Some(7),
        ..config(true)
    };
    let (mut service, mut sink) =
        make_service(&cfg, &[(300.0, 5.0), (298.0, 5.0), (295.0, 5.0)]);
    let mut bridge = SimulatedBridge::from_config(&cfg);
    service.start(&mut bridge, &mut sink);

    for k in 1..=400 {
        service.tick(&mut bridge, &mut sink, f64::from(k));
    }

    let snap = service.snapshot();
    assert_eq!(snap.schedule_index, 2);
    assert_eq!(snap.state, StateId::StableWaiting);
    assert!(snap.is_stable);
    assert!((snap.temperature - 295.0).abs() <= 0.5);
    assert_eq!(
        sink.setpoint_changes(),
        vec![(0, 1, 298.0), (1, 2, 295.0)]
    );
    assert_eq!(sink.faults(), 0);
}
