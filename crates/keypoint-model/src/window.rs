//! Half-open time windows in video seconds.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A time range `[start_secs, end_secs)` within the source video.
///
/// A window is never empty: construction fails when `start >= end` or
/// either bound is not finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TimeWindow {
    /// Create a window, or `None` when the range is empty or not finite.
    pub fn new(start_secs: f64, end_secs: f64) -> Option<Self> {
        if !start_secs.is_finite() || !end_secs.is_finite() || start_secs >= end_secs {
            return None;
        }
        Some(Self {
            start_secs,
            end_secs,
        })
    }

    /// Create a window and clamp it to `[0, duration_secs)`.
    ///
    /// Returns `None` when nothing is left after clamping.
    pub fn clamped(start_secs: f64, end_secs: f64, duration_secs: f64) -> Option<Self> {
        Self::new(start_secs.max(0.0), end_secs.min(duration_secs))
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Whether `other` overlaps this window or starts exactly where it ends.
    pub fn overlaps_or_touches(&self, other: &TimeWindow) -> bool {
        other.start_secs <= self.end_secs && self.start_secs <= other.end_secs
    }

    /// Total order: by start, then by end.
    pub fn chronological_cmp(&self, other: &TimeWindow) -> Ordering {
        self.start_secs
            .total_cmp(&other.start_secs)
            .then_with(|| self.end_secs.total_cmp(&other.end_secs))
    }
}

/// Sum of window durations.
pub fn total_duration(windows: &[TimeWindow]) -> f64 {
    windows.iter().map(TimeWindow::duration_secs).sum()
}
