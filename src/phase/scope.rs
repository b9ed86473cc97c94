//! Scoped start/stop of a phase.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::error::PhaseError;
use crate::phase::PhaseTimer;

/// Guard returned by [`PhaseTimer::scope`].
///
/// Entering starts the phase unless it is already started. The phase is
/// stopped exactly once when the guard goes away: either through
/// [`finish`](Self::finish), which reports a failed stop, or on drop
/// (normal exit, early return, unwinding), which logs it.
///
/// ```
/// use phaselog::PhaseTimer;
///
/// let mut phase = PhaseTimer::new("parse");
/// {
///     let mut scope = phase.scope();
///     scope.set("files", 3).unwrap();
/// }
/// assert!(phase.is_stopped());
/// ```
#[must_use = "dropping the scope immediately stops the phase"]
pub struct PhaseScope<'a> {
    phase: &'a mut PhaseTimer,
    armed: bool,
}

impl<'a> PhaseScope<'a> {
    pub(crate) fn enter(phase: &'a mut PhaseTimer) -> Self {
        if !phase.is_started() {
            phase.begin();
        }
        Self { phase, armed: true }
    }

    /// Stops the phase now and returns the elapsed seconds.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidStopCommand`] if the phase was already
    /// stopped inside the scope.
    pub fn finish(mut self) -> Result<f64, PhaseError> {
        self.armed = false;
        self.phase.stop(false)
    }
}

impl Deref for PhaseScope<'_> {
    type Target = PhaseTimer;

    fn deref(&self) -> &PhaseTimer {
        self.phase
    }
}

impl DerefMut for PhaseScope<'_> {
    fn deref_mut(&mut self) -> &mut PhaseTimer {
        self.phase
    }
}

impl Drop for PhaseScope<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Err(e) = self.phase.stop(false) {
            warn!(phase = %self.phase.id(), error = %e, "phase scope exited without stopping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseStatus;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn test_scope_starts_and_stops() {
        let mut phase = PhaseTimer::new("p");
        {
            let scope = phase.scope();
            assert_eq!(scope.status(), PhaseStatus::Running);
        }
        assert_eq!(phase.status(), PhaseStatus::Stopped);
        assert!(phase.elapsed_seconds().unwrap() >= 0.0);
    }

    #[test]
    fn test_scope_keeps_existing_start() {
        let mut phase = PhaseTimer::new("p").started();
        let start = phase.start_time();
        phase.scope().finish().unwrap();
        assert_eq!(phase.start_time(), start);
        assert!(phase.is_stopped());
    }

    #[test]
    fn test_finish_disarms_drop() {
        let mut phase = PhaseTimer::new("p");
        let scope = phase.scope();
        scope.finish().unwrap();
        let end = phase.end_time();
        // A second stop would have moved the end time or failed loudly.
        assert_eq!(phase.end_time(), end);
        assert!(phase.is_stopped());
    }

    #[test]
    fn test_finish_reports_manual_stop() {
        let mut phase = PhaseTimer::new("p");
        let mut scope = phase.scope();
        scope.stop(false).unwrap();
        assert!(matches!(
            scope.finish(),
            Err(PhaseError::InvalidStopCommand { .. })
        ));
    }

    #[test]
    fn test_scope_stops_on_panic() {
        let mut phase = PhaseTimer::new("p");
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut scope = phase.scope();
            scope.set("step", 1).unwrap();
            panic!("work failed");
        }));
        assert!(result.is_err());
        assert!(phase.is_stopped());
        assert_eq!(phase.get("step").unwrap().as_ref(), &serde_json::json!(1));
    }

    #[test]
    fn test_scoped_closure() {
        let mut phase = PhaseTimer::new("p");
        let value = phase
            .scoped(|p| {
                p.set("rows", 10).unwrap();
                7
            })
            .unwrap();
        assert_eq!(value, 7);
        assert!(phase.is_stopped());
    }

    #[test]
    fn test_scoped_early_return_path() {
        fn work(phase: &mut PhaseTimer, bail: bool) -> Result<u32, &'static str> {
            let _scope = phase.scope();
            if bail {
                return Err("bailed");
            }
            Ok(1)
        }

        let mut phase = PhaseTimer::new("p");
        assert!(work(&mut phase, true).is_err());
        assert!(phase.is_stopped());
    }
}
