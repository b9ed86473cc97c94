//! Shared integration-test helpers.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use phaselog::{PhaseId, PhaseObserver};

/// One observed transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Started(String),
    Stopped(String, f64),
}

/// Observer that keeps every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl PhaseObserver for RecordingObserver {
    fn on_phase_started(&self, phase_id: &PhaseId, _start_time: DateTime<Utc>) {
        self.seen
            .lock()
            .unwrap()
            .push(Notification::Started(phase_id.to_string()));
    }

    fn on_phase_stopped(&self, phase_id: &PhaseId, _end_time: DateTime<Utc>, elapsed_seconds: f64) {
        self.seen
            .lock()
            .unwrap()
            .push(Notification::Stopped(phase_id.to_string(), elapsed_seconds));
    }
}

/// Runs the `phaselog` binary with `args` in `cwd` and waits for it.
pub fn phaselog(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_phaselog"))
        .args(args)
        .current_dir(cwd)
        .env_remove("PHASELOG_LOG_LEVEL")
        .env_remove("PHASELOG_OUTPUT")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to spawn phaselog")
}
