//! Clip sequence: the ordered sub-clip requests for one highlight reel.

use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

/// One sub-clip to extract from the source video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    /// Position in the final reel.
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl ClipRequest {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start_secs: self.start_secs,
            end_secs: self.end_secs,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Chronologically ordered, pairwise-disjoint clip requests.
///
/// Built once per run from merged windows; never reordered afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipSequence {
    clips: Vec<ClipRequest>,
}

impl ClipSequence {
    /// Build a sequence from merged windows.
    ///
    /// The windows are expected to be sorted and disjoint already; their
    /// order is kept as-is.
    pub fn from_windows(windows: &[TimeWindow]) -> Self {
        let clips = windows
            .iter()
            .enumerate()
            .map(|(index, w)| ClipRequest {
                index,
                start_secs: w.start_secs,
                end_secs: w.end_secs,
            })
            .collect();
        Self { clips }
    }

    pub fn clips(&self) -> &[ClipRequest] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Running time of the concatenated reel.
    pub fn total_duration_secs(&self) -> f64 {
        self.clips.iter().map(ClipRequest::duration_secs).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClipRequest> {
        self.clips.iter()
    }
}
