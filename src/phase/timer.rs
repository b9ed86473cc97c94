//! Phase timer state machine.
//!
//! A [`PhaseTimer`] moves through `NotStarted → Running → Stopped`.
//! `start(true)` / `stop(true)` bypass the state check and overwrite the
//! previous timing. Every successful transition notifies the attached
//! [`PhaseObserver`] exactly once; failed transitions change nothing.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PhaseError, RecordError};
use crate::observability::PhaseObserver;
use crate::phase::PhaseId;
use crate::phase::codec::format_timestamp;
use crate::phase::scope::PhaseScope;
use crate::record::{OrderedRecord, write_fields};

/// Name of the identifier field in serialized phases.
pub const ID_FIELD: &str = "id";
/// Name of the start timestamp field.
pub const START_TIME_FIELD: &str = "start_time";
/// Name of the end timestamp field.
pub const END_TIME_FIELD: &str = "end_time";
/// Name of the elapsed duration field, in seconds.
pub const ELAPSED_FIELD: &str = "elapsed_seconds";

/// Field names owned by the phase itself. They never appear as data keys.
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, START_TIME_FIELD, END_TIME_FIELD, ELAPSED_FIELD];

/// Returns whether `key` is one of the [`RESERVED_FIELDS`].
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Lifecycle state of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// No start recorded.
    NotStarted,
    /// Started, not yet stopped.
    Running,
    /// Stopped for the current start cycle.
    Stopped,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.pad("not started"),
            Self::Running => f.pad("running"),
            Self::Stopped => f.pad("stopped"),
        }
    }
}

/// Timing state kept outside the data record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Timing {
    pub(crate) start: Option<DateTime<Utc>>,
    pub(crate) end: Option<DateTime<Utc>>,
    pub(crate) elapsed_seconds: Option<f64>,
}

/// A named span of work with start/stop timing and attached data.
///
/// Equality, `Display` and serialization cover the id, the timing fields
/// and the data record. The observer is excluded from all three.
///
/// `PhaseTimer` has no `Hash` impl; containers key phases by [`PhaseId`].
#[derive(Clone)]
pub struct PhaseTimer {
    id: PhaseId,
    observer: Option<Arc<dyn PhaseObserver>>,
    data: OrderedRecord,
    pub(crate) timing: Timing,
}

impl PhaseTimer {
    /// Creates an unstarted phase with no observer and no data.
    #[must_use]
    pub fn new(id: impl Into<PhaseId>) -> Self {
        Self {
            id: id.into(),
            observer: None,
            data: OrderedRecord::new(),
            timing: Timing::default(),
        }
    }

    /// Attaches an observer. Builder form of [`set_observer`](Self::set_observer).
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PhaseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replaces the data record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ReservedField`] if `data` uses a reserved name.
    pub fn with_data(mut self, data: OrderedRecord) -> Result<Self, RecordError> {
        if let Some(key) = data.keys().find(|k| is_reserved(k)) {
            return Err(RecordError::ReservedField {
                key: key.to_owned(),
            });
        }
        self.data = data;
        Ok(self)
    }

    /// Starts a fresh phase. Builder form of `start(false)` on a new phase,
    /// which cannot fail.
    #[must_use]
    pub fn started(mut self) -> Self {
        if !self.is_started() {
            self.begin();
        }
        self
    }

    /// Rebuilds a phase from already-recorded parts without notifying anyone.
    pub(crate) fn from_parts(id: PhaseId, data: OrderedRecord, timing: Timing) -> Self {
        Self {
            id,
            observer: None,
            data,
            timing,
        }
    }

    /// The phase identifier.
    #[must_use]
    pub const fn id(&self) -> &PhaseId {
        &self.id
    }

    /// The attached observer, if any.
    #[must_use]
    pub fn observer(&self) -> Option<&Arc<dyn PhaseObserver>> {
        self.observer.as_ref()
    }

    /// Attaches, replaces or removes the observer.
    pub fn set_observer(&mut self, observer: Option<Arc<dyn PhaseObserver>>) {
        self.observer = observer;
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Starts the phase.
    ///
    /// With `force`, an already started phase is restarted and its stop data
    /// is discarded immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidStartCommand`] if the phase was already
    /// started and `force` is false. Timing is left untouched.
    pub fn start(&mut self, force: bool) -> Result<(), PhaseError> {
        if self.is_started() && !force {
            return Err(PhaseError::InvalidStartCommand {
                phase_id: self.id.clone(),
            });
        }
        self.begin();
        Ok(())
    }

    /// Stops the phase and returns the elapsed seconds.
    ///
    /// With `force`, an already stopped phase is stopped again and its end
    /// time and elapsed value are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidStopCommand`] if the phase was never
    /// started, or if it is already stopped and `force` is false.
    pub fn stop(&mut self, force: bool) -> Result<f64, PhaseError> {
        let Some(start) = self.timing.start else {
            return Err(self.invalid_stop());
        };
        if self.is_stopped() && !force {
            return Err(self.invalid_stop());
        }

        let end = Utc::now();
        let elapsed = elapsed_between(&self.id, start, end);
        self.timing.end = Some(end);
        self.timing.elapsed_seconds = Some(elapsed);

        debug!(phase = %self.id, elapsed_seconds = elapsed, "phase stopped");
        if let Some(observer) = &self.observer {
            observer.on_phase_stopped(&self.id, end, elapsed);
        }
        Ok(elapsed)
    }

    fn invalid_stop(&self) -> PhaseError {
        PhaseError::InvalidStopCommand {
            phase_id: self.id.clone(),
        }
    }

    /// Unconditional start: stamps now, clears stop data, notifies.
    pub(crate) fn begin(&mut self) {
        let now = Utc::now();
        self.timing = Timing {
            start: Some(now),
            end: None,
            elapsed_seconds: None,
        };

        debug!(phase = %self.id, "phase started");
        if let Some(observer) = &self.observer {
            observer.on_phase_started(&self.id, now);
        }
    }

    /// Whether a start timestamp has been recorded.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.timing.start.is_some()
    }

    /// Whether the current start cycle has been stopped.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.timing.end.is_some()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> PhaseStatus {
        match (self.timing.start, self.timing.end) {
            (None, _) => PhaseStatus::NotStarted,
            (Some(_), None) => PhaseStatus::Running,
            (Some(_), Some(_)) => PhaseStatus::Stopped,
        }
    }

    /// Start timestamp of the current cycle.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.timing.start
    }

    /// End timestamp of the current cycle.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.timing.end
    }

    /// Elapsed seconds of the last completed cycle.
    #[must_use]
    pub const fn elapsed_seconds(&self) -> Option<f64> {
        self.timing.elapsed_seconds
    }

    /// Elapsed time of the last completed cycle.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.timing
            .elapsed_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Enters a scope: starts the phase unless it is already started and
    /// returns a guard that stops it when dropped.
    pub fn scope(&mut self) -> PhaseScope<'_> {
        PhaseScope::enter(self)
    }

    /// Runs `f` inside a [`scope`](Self::scope) and stops the phase
    /// afterwards, also when `f` panics.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidStopCommand`] if `f` left the phase
    /// already stopped.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R, PhaseError> {
        let mut scope = self.scope();
        let out = f(&mut *scope);
        scope.finish()?;
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Field proxy
    // ------------------------------------------------------------------

    /// Sets a data field. Returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ReservedField`] for reserved names.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, RecordError> {
        let key = key.into();
        if is_reserved(&key) {
            return Err(RecordError::ReservedField { key });
        }
        Ok(self.data.set(key, value))
    }

    /// Reads a field. Reserved names resolve to the phase's own state.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnknownField`] if the field was never set,
    /// including timing fields of a phase that has not reached them yet.
    pub fn get(&self, key: &str) -> Result<Cow<'_, Value>, RecordError> {
        if is_reserved(key) {
            return self
                .reserved_value(key)
                .map(Cow::Owned)
                .ok_or_else(|| RecordError::unknown(key));
        }
        self.data.get(key).map(Cow::Borrowed)
    }

    /// Removes a data field.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ReservedField`] for reserved names and
    /// [`RecordError::UnknownField`] if the field is absent.
    pub fn delete(&mut self, key: &str) -> Result<Value, RecordError> {
        if is_reserved(key) {
            return Err(RecordError::ReservedField {
                key: key.to_owned(),
            });
        }
        self.data.delete(key)
    }

    /// The caller-attached data, without id or timing.
    #[must_use]
    pub const fn data(&self) -> &OrderedRecord {
        &self.data
    }

    fn reserved_value(&self, key: &str) -> Option<Value> {
        match key {
            ID_FIELD => Some(Value::String(self.id.to_string())),
            _ => self
                .timing_fields()
                .into_iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value),
        }
    }

    /// Timing fields that are set, in canonical order.
    pub(crate) fn timing_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = Vec::with_capacity(3);
        if let Some(start) = self.timing.start {
            fields.push((START_TIME_FIELD, Value::String(format_timestamp(start))));
        }
        if let Some(end) = self.timing.end {
            fields.push((END_TIME_FIELD, Value::String(format_timestamp(end))));
        }
        if let Some(elapsed) = self.timing.elapsed_seconds {
            fields.push((ELAPSED_FIELD, Value::from(elapsed)));
        }
        fields
    }
}

/// Seconds between `start` and `end`, clamped at zero when the wall clock
/// stepped backwards.
fn elapsed_between(id: &PhaseId, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).to_std().map_or_else(
        |_| {
            warn!(phase = %id, %start, %end, "clock moved backwards, recording zero elapsed time");
            0.0
        },
        |d| d.as_secs_f64(),
    )
}

impl PartialEq for PhaseTimer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.timing == other.timing && self.data == other.data
    }
}

impl fmt::Debug for PhaseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTimer")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("timing", &self.timing)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PhaseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhaseTimer<{}> - ", self.id)?;
        let timing = self.timing_fields();
        write_fields(
            f,
            timing
                .iter()
                .map(|(k, v)| (*k, v))
                .chain(self.data.items()),
        )
    }
}
