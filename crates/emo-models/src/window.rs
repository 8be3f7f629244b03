//! Trim window definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Longest clip the pipeline will analyse (seconds).
pub const MAX_CLIP_SECS: f64 = 300.0;

/// Duration assumed when the source cannot be probed (seconds).
pub const DEFAULT_MEDIA_DURATION_SECS: f64 = 300.0;

/// Time range of the source media selected for processing.
///
/// Invariants: `0 <= start < end` and `end - start <= MAX_CLIP_SECS`.
/// Values are only produced by the trim planner, which sanitizes its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimWindow {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
}

impl TrimWindow {
    /// Window length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
