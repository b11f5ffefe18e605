//! Frame clock utilities.
//!
//! Keypoint rows and video frames share one time axis: frame `i` starts at
//! `i / fps` seconds. This module provides utilities for:
//! - Converting between frame indices and seconds
//! - Estimating the frame count of a video from its duration
//! - Checking that a keypoint series and a video are frame-aligned

use crate::error::{PawreelError, PawreelResult};

/// Converts between dense frame indices and video time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    /// Create a clock for the given frame rate.
    pub fn new(fps: f64) -> PawreelResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(PawreelError::config(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        Ok(Self { fps })
    }

    /// Frames per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Start time of a frame in seconds.
    pub fn frame_to_secs(&self, frame: usize) -> f64 {
        frame as f64 / self.fps
    }

    /// Number of frames a video of `duration_secs` is expected to hold.
    pub fn expected_frames(&self, duration_secs: f64) -> u64 {
        (duration_secs.max(0.0) * self.fps).round() as u64
    }

    /// Total duration covered by `frame_count` frames.
    pub fn duration_of(&self, frame_count: usize) -> f64 {
        frame_count as f64 / self.fps
    }
}

/// Fail with `InputMismatch` when the two frame counts differ by more
/// than `tolerance_frames`.
pub fn check_alignment(
    keypoint_frames: u64,
    video_frames: u64,
    tolerance_frames: u64,
) -> PawreelResult<()> {
    if keypoint_frames.abs_diff(video_frames) > tolerance_frames {
        return Err(PawreelError::InputMismatch {
            keypoint_frames,
            video_frames,
            tolerance_frames,
        });
    }
    Ok(())
}
