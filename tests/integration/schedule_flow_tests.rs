//! Schedule input → service → output sinks.
//!
//! Exercises the file-facing edges: schedule CSV, JSON config with an
//! embedded schedule, and the CSV/history sinks fed by a real run.

use std::fs;

use crate::mock_hw::ScriptedBridge;

use cryoloop::adapters::config_file::JsonConfigFile;
use cryoloop::adapters::csv_log::{CSV_HEADER, CsvHistoryLog};
use cryoloop::adapters::history::TelemetryHistory;
use cryoloop::app::ports::ConfigPort;
use cryoloop::app::service::ControlService;
use cryoloop::config::ControllerConfig;
use cryoloop::schedule::{Schedule, ScheduleEntry, load_schedule_file, parse_schedule};

fn config() -> ControllerConfig {
    ControllerConfig {
        noise_std_dev: 0.0,
        ..ControllerConfig::default()
    }
}

// ── Schedule sources ──────────────────────────────────────────

#[test]
fn schedule_file_drives_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schedule.csv");
    fs::write(&path, "setpoints,300,290\nstable_times,2,4\n").unwrap();

    let schedule = load_schedule_file(&path, 10.0);
    assert_eq!(
        schedule.entries(),
        &[ScheduleEntry::new(300.0, 2.0), ScheduleEntry::new(290.0, 4.0)]
    );

    let mut service = ControlService::new(&config(), schedule).unwrap();
    let mut bridge = ScriptedBridge::constant(300.0);
    let mut sink = TelemetryHistory::new();
    for k in 1..=3 {
        service.tick(&mut bridge, &mut sink, f64::from(k));
    }
    assert_eq!(service.current_target(), 290.0);
}

#[test]
fn mismatched_dwell_row_becomes_uniform() {
    let schedule = parse_schedule("setpoints,300,298,295\nstable_times,7,8\n", 10.0);
    assert!(schedule.entries().iter().all(|e| e.dwell_time == 7.0));
    assert_eq!(schedule.len(), 3);

    let schedule = Schedule::from_lists(&[300.0, 295.0], &[], 12.0).unwrap();
    assert!(schedule.entries().iter().all(|e| e.dwell_time == 12.0));
}

#[test]
fn unreadable_schedule_file_falls_back_to_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let schedule = load_schedule_file(&dir.path().join("missing.csv"), 10.0);
    assert_eq!(schedule, Schedule::builtin());
}

#[test]
fn config_file_supplies_gains_and_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cryoloop.json");
    fs::write(
        &path,
        r#"{
            "kp": -100.0,
            "auto_advance": false,
            "schedule": [
                { "setpoint": 80.0, "dwell_time": 30.0 },
                { "setpoint": 77.0, "dwell_time": 60.0 }
            ]
        }"#,
    )
    .unwrap();

    let file = JsonConfigFile::new(&path);
    let cfg = file.load().unwrap();
    let schedule = file.load_schedule().unwrap().unwrap();
    let service = ControlService::new(&cfg, schedule).unwrap();

    assert_eq!(cfg.kp, -100.0);
    assert!(!service.snapshot().auto_advance);
    assert_eq!(service.current_target(), 80.0);
    assert_eq!(service.next_target(), Some(77.0));
}

// ── Output sinks ──────────────────────────────────────────────

#[test]
fn csv_log_and_history_record_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("history.csv");
    let cfg = ControllerConfig {
        control_loop_interval_ms: 500,
        ..config()
    };
    let schedule = Schedule::new(vec![ScheduleEntry::new(300.0, 1.0)]).unwrap();
    let mut service = ControlService::new(&cfg, schedule).unwrap();
    let mut bridge = ScriptedBridge::constant(300.2);
    let mut sink = (
        TelemetryHistory::new(),
        Some(CsvHistoryLog::open(&csv_path).unwrap()),
    );

    // Ten half-second ticks span five whole seconds.
    for k in 1..=10 {
        service.tick(&mut bridge, &mut sink, f64::from(k) * 0.5);
    }
    drop(sink.1.take());

    let history = &sink.0;
    assert_eq!(history.len(), 10);
    assert_eq!(history.latest().map(|s| s.timestamp), Some(5.0));
    assert!(history.iter().all(|s| s.temperature == 300.2 && s.setpoint == 300.0));

    let text = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], CSV_HEADER);
    // Seconds 0 through 5, one row each.
    assert_eq!(lines.len(), 1 + 6);
    assert!(lines[1].starts_with("0.500,300.2000,300.0000"));
}
