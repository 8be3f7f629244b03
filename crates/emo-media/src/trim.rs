//! Trim window planning.
//!
//! Turns the caller's requested start/end and the probed media duration into
//! a [`TrimWindow`]. Planning never fails: anything unusable falls back to
//! the defaults.

use emo_models::{TrimWindow, DEFAULT_MEDIA_DURATION_SECS, MAX_CLIP_SECS};
use tracing::debug;

/// Computes clamped trim windows.
#[derive(Debug, Clone, Copy)]
pub struct TrimPlanner {
    /// Longest window produced
    max_clip_secs: f64,
    /// Duration used when probing failed
    fallback_duration: f64,
}

impl Default for TrimPlanner {
    fn default() -> Self {
        Self {
            max_clip_secs: MAX_CLIP_SECS,
            fallback_duration: DEFAULT_MEDIA_DURATION_SECS,
        }
    }
}

impl TrimPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan a window.
    ///
    /// - `start`: missing, negative or non-finite becomes 0.0
    /// - `end`: missing, non-positive, non-finite or past `duration` becomes
    ///   `min(duration, max_clip_secs)`
    /// - windows longer than `max_clip_secs` are cut to `start + max_clip_secs`
    /// - a start at or past the final end resets to 0.0
    pub fn plan(&self, start: Option<f64>, end: Option<f64>, duration: Option<f64>) -> TrimWindow {
        let duration = duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.fallback_duration);

        let mut start = start.filter(|s| s.is_finite() && *s >= 0.0).unwrap_or(0.0);

        let mut end = match end.filter(|e| e.is_finite() && *e > 0.0) {
            Some(e) if e <= duration => e,
            _ => duration.min(self.max_clip_secs),
        };

        if end - start > self.max_clip_secs {
            end = start + self.max_clip_secs;
        }

        if start >= end {
            debug!(start, end, "Requested start outside clip, analysing from 0");
            start = 0.0;
            end = end.min(self.max_clip_secs);
        }

        TrimWindow { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(window: TrimWindow, duration: f64) {
        assert!(window.start >= 0.0, "{:?}", window);
        assert!(window.start < window.end, "{:?}", window);
        assert!(window.end <= window.start + MAX_CLIP_SECS + 1e-9, "{:?}", window);
        assert!(window.end <= duration + 1e-9, "{:?}", window);
    }

    #[test]
    fn test_end_defaults_to_duration() {
        let window = TrimPlanner::new().plan(None, None, Some(120.0));
        assert_eq!(window, TrimWindow { start: 0.0, end: 120.0 });
    }

    #[test]
    fn test_long_media_capped() {
        let window = TrimPlanner::new().plan(None, None, Some(1000.0));
        assert_eq!(window, TrimWindow { start: 0.0, end: 300.0 });
    }

    #[test]
    fn test_probe_failure_uses_fallback() {
        let window = TrimPlanner::new().plan(None, None, None);
        assert_eq!(window.end, DEFAULT_MEDIA_DURATION_SECS);

        let window = TrimPlanner::new().plan(None, None, Some(f64::NAN));
        assert_eq!(window.end, DEFAULT_MEDIA_DURATION_SECS);
    }

    #[test]
    fn test_end_past_duration_clamped() {
        let window = TrimPlanner::new().plan(Some(5.0), Some(90.0), Some(60.0));
        assert_eq!(window, TrimWindow { start: 5.0, end: 60.0 });
    }

    #[test]
    fn test_window_longer_than_limit() {
        let window = TrimPlanner::new().plan(Some(100.0), Some(900.0), Some(1000.0));
        assert_eq!(window, TrimWindow { start: 100.0, end: 400.0 });
    }

    #[test]
    fn test_negative_start_defaults() {
        let window = TrimPlanner::new().plan(Some(-4.0), Some(8.0), Some(10.0));
        assert_eq!(window, TrimWindow { start: 0.0, end: 8.0 });
    }

    #[test]
    fn test_zero_end_treated_as_unset() {
        let window = TrimPlanner::new().plan(Some(0.0), Some(0.0), Some(10.0));
        assert_eq!(window, TrimWindow { start: 0.0, end: 10.0 });
    }

    #[test]
    fn test_start_past_end_resets() {
        let window = TrimPlanner::new().plan(Some(50.0), None, Some(20.0));
        assert_eq!(window, TrimWindow { start: 0.0, end: 20.0 });

        let window = TrimPlanner::new().plan(Some(8.0), Some(3.0), Some(10.0));
        assert_eq!(window, TrimWindow { start: 0.0, end: 3.0 });
    }

    #[test]
    fn test_windows_always_valid() {
        let planner = TrimPlanner::new();
        let starts = [None, Some(-1.0), Some(0.0), Some(3.5), Some(250.0), Some(999.0), Some(f64::INFINITY)];
        let ends = [None, Some(-2.0), Some(0.0), Some(1.0), Some(100.0), Some(400.0), Some(5000.0), Some(f64::NAN)];
        let durations = [None, Some(0.0), Some(0.5), Some(10.0), Some(120.0), Some(300.0), Some(1000.0)];

        for start in starts {
            for end in ends {
                for duration in durations {
                    let window = planner.plan(start, end, duration);
                    let effective = duration
                        .filter(|d| *d > 0.0)
                        .unwrap_or(DEFAULT_MEDIA_DURATION_SECS);
                    assert_valid(window, effective);
                }
            }
        }
    }
}
