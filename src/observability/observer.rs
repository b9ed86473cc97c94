//! Phase lifecycle observers.
//!
//! A [`PhaseObserver`] is notified synchronously, exactly once per
//! successful start or stop transition of a phase it is attached to.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::phase::PhaseId;
use crate::phase::codec::format_timestamp;

/// Receiver of phase start/stop notifications.
///
/// Observers are shared between phases and across threads, so they take
/// `&self` and must be `Send + Sync`.
pub trait PhaseObserver: Send + Sync {
    /// Called after a phase recorded its start timestamp.
    fn on_phase_started(&self, phase_id: &PhaseId, start_time: DateTime<Utc>);

    /// Called after a phase recorded its end timestamp.
    fn on_phase_stopped(&self, phase_id: &PhaseId, end_time: DateTime<Utc>, elapsed_seconds: f64);
}

/// Logs each transition as an `info` event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PhaseObserver for TracingObserver {
    fn on_phase_started(&self, phase_id: &PhaseId, start_time: DateTime<Utc>) {
        info!(
            phase = %phase_id,
            start_time = %format_timestamp(start_time),
            "phase started"
        );
    }

    fn on_phase_stopped(&self, phase_id: &PhaseId, end_time: DateTime<Utc>, elapsed_seconds: f64) {
        info!(
            phase = %phase_id,
            end_time = %format_timestamp(end_time),
            elapsed_seconds,
            "phase stopped"
        );
    }
}

/// Forwards every notification to each member, in insertion order.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn PhaseObserver>>,
}

impl ObserverSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer.
    pub fn push(&mut self, observer: Arc<dyn PhaseObserver>) {
        self.observers.push(observer);
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.push(observer);
        self
    }

    /// Number of member observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}

impl PhaseObserver for ObserverSet {
    fn on_phase_started(&self, phase_id: &PhaseId, start_time: DateTime<Utc>) {
        for observer in &self.observers {
            observer.on_phase_started(phase_id, start_time);
        }
    }

    fn on_phase_stopped(&self, phase_id: &PhaseId, end_time: DateTime<Utc>, elapsed_seconds: f64) {
        for observer in &self.observers {
            observer.on_phase_stopped(phase_id, end_time, elapsed_seconds);
        }
    }
}
