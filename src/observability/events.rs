//! Structured event stream for `phaselog`.
//!
//! Discrete, typed events emitted while phases run. Events are serialized
//! as newline-delimited JSON (JSONL) and carry a monotonically increasing
//! sequence number for ordering guarantees.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observability::PhaseObserver;
use crate::phase::PhaseId;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a run.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A run plan has started executing.
    RunStarted {
        /// When the run started.
        timestamp: DateTime<Utc>,
        /// Plan name, or the plan file name.
        plan: String,
        /// Number of phases in the plan.
        phases: usize,
    },

    /// A phase recorded its start.
    PhaseStarted {
        /// The phase start timestamp.
        timestamp: DateTime<Utc>,
        /// Id of the phase.
        phase_id: PhaseId,
    },

    /// A phase recorded its end.
    PhaseStopped {
        /// The phase end timestamp.
        timestamp: DateTime<Utc>,
        /// Id of the phase.
        phase_id: PhaseId,
        /// Seconds between start and end.
        elapsed_seconds: f64,
    },

    /// A run plan has finished.
    RunFinished {
        /// When the run finished.
        timestamp: DateTime<Utc>,
        /// Number of phases that were executed.
        phases: usize,
        /// Whether every executed command succeeded.
        success: bool,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are dropped: event
/// output never interrupts the phases being observed.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Observer adapter
// ---------------------------------------------------------------------------

/// Turns phase notifications into [`Event::PhaseStarted`] and
/// [`Event::PhaseStopped`] lines on a shared emitter.
#[derive(Debug, Clone)]
pub struct EventObserver {
    emitter: Arc<EventEmitter>,
}

impl EventObserver {
    /// Creates an observer writing to `emitter`.
    #[must_use]
    pub const fn new(emitter: Arc<EventEmitter>) -> Self {
        Self { emitter }
    }

    /// The emitter this observer writes to.
    #[must_use]
    pub const fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }
}

impl PhaseObserver for EventObserver {
    fn on_phase_started(&self, phase_id: &PhaseId, start_time: DateTime<Utc>) {
        self.emitter.emit(Event::PhaseStarted {
            timestamp: start_time,
            phase_id: phase_id.clone(),
        });
    }

    fn on_phase_stopped(&self, phase_id: &PhaseId, end_time: DateTime<Utc>, elapsed_seconds: f64) {
        self.emitter.emit(Event::PhaseStopped {
            timestamp: end_time,
            phase_id: phase_id.clone(),
            elapsed_seconds,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
