//! Aggregate preload progress.

use serde::Serialize;

/// Snapshot of the preload run.
///
/// Every publication is a full snapshot, never a delta. Within one run the
/// counters only grow, `started` and `done` never revert, and once `total` is
/// known `loaded + failed <= total` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PreloadState {
    /// `start` has been called.
    pub started: bool,
    /// Every discovered asset has been attempted.
    pub done: bool,
    /// Number of discovered assets.
    pub total: usize,
    /// Assets loaded successfully.
    pub loaded: usize,
    /// Assets whose load failed.
    pub failed: usize,
}

impl PreloadState {
    /// Assets attempted so far, successful or not.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.loaded + self.failed
    }

    /// Fraction of assets attempted, in `0.0..=1.0`.
    ///
    /// An empty run that is done counts as complete.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return if self.done { 1.0 } else { 0.0 };
        }
        self.attempted() as f64 / self.total as f64
    }

    /// Whether the run finished with no failures.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.done && self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state = PreloadState::default();
        assert!(!state.started);
        assert!(!state.done);
        assert_eq!(state.attempted(), 0);
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn test_progress() {
        let state = PreloadState {
            started: true,
            done: false,
            total: 4,
            loaded: 2,
            failed: 1,
        };
        assert_eq!(state.attempted(), 3);
        assert!((state.progress() - 0.75).abs() < f64::EPSILON);
        assert!(!state.is_clean());
    }

    #[test]
    fn test_empty_done_run_is_complete() {
        let state = PreloadState {
            started: true,
            done: true,
            ..Default::default()
        };
        assert_eq!(state.progress(), 1.0);
        assert!(state.is_clean());
    }

    #[test]
    fn test_serializes_all_fields() {
        let json = serde_json::to_value(PreloadState::default()).unwrap();
        for field in ["started", "done", "total", "loaded", "failed"] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
