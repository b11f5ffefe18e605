//! Error types shared across PawReel crates.

use std::path::PathBuf;

/// Top-level error type for PawReel operations.
#[derive(Debug, thiserror::Error)]
pub enum PawreelError {
    /// Keypoint frame count and video frame count disagree beyond tolerance.
    #[error(
        "Input mismatch: keypoints have {keypoint_frames} frames, video has {video_frames} (tolerance {tolerance_frames})"
    )]
    InputMismatch {
        keypoint_frames: u64,
        video_frames: u64,
        tolerance_frames: u64,
    },

    /// Invalid frame index or unknown body part requested.
    #[error("Out of range: {message}")]
    OutOfRange { message: String },

    /// Nothing worth keeping: no frame exceeded the activity threshold, or
    /// the clip sequence handed to assembly was empty.
    #[error("No highlights: {message}")]
    EmptyHighlight { frame_count: usize, message: String },

    /// The media backend could not produce a requested sub-clip.
    #[error("Extraction failed for [{start_secs:.3}s, {end_secs:.3}s): {message}")]
    Extraction {
        start_secs: f64,
        end_secs: f64,
        message: String,
    },

    #[error("Keypoint input error: {message}")]
    Keypoints { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Overlay error: {message}")]
    Overlay { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PawreelError.
pub type PawreelResult<T> = Result<T, PawreelError>;

impl PawreelError {
    pub fn frame_out_of_range(frame: usize, frame_count: usize) -> Self {
        Self::OutOfRange {
            message: format!("frame {frame} is outside [0, {frame_count})"),
        }
    }

    pub fn unknown_part(part: &str) -> Self {
        Self::OutOfRange {
            message: format!("unknown body part '{part}'"),
        }
    }

    pub fn empty_highlight(frame_count: usize, threshold: f64) -> Self {
        Self::EmptyHighlight {
            frame_count,
            message: format!("none of {frame_count} frames exceeded threshold {threshold:.4}"),
        }
    }

    pub fn empty_clip_sequence() -> Self {
        Self::EmptyHighlight {
            frame_count: 0,
            message: "clip sequence is empty, nothing to assemble".to_string(),
        }
    }

    pub fn extraction(start_secs: f64, end_secs: f64, msg: impl Into<String>) -> Self {
        Self::Extraction {
            start_secs,
            end_secs,
            message: msg.into(),
        }
    }

    pub fn keypoints(msg: impl Into<String>) -> Self {
        Self::Keypoints {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn overlay(msg: impl Into<String>) -> Self {
        Self::Overlay {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether the caller can reasonably fall back instead of aborting.
    ///
    /// Only an empty highlight result qualifies: the run itself succeeded,
    /// it just found nothing worth keeping.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyHighlight { .. })
    }
}
