//! Media backend seam.
//!
//! The highlight pipeline never decodes or encodes video itself. It asks a
//! [`MediaBackend`] to probe the source, cut sub-clips, and join them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pawreel_common::clock::FrameClock;
use pawreel_common::error::PawreelResult;
use pawreel_keypoint_model::window::TimeWindow;
use serde::{Deserialize, Serialize};

/// Basic properties of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Frame count reported by the container, when it has one.
    pub frame_count: Option<u64>,
}

impl MediaInfo {
    /// Clock for the video's frame rate.
    pub fn clock(&self) -> PawreelResult<FrameClock> {
        FrameClock::new(self.fps)
    }

    /// Reported frame count, or one estimated from duration and rate.
    pub fn frame_count_estimate(&self) -> PawreelResult<u64> {
        match self.frame_count {
            Some(count) => Ok(count),
            None => Ok(self.clock()?.expected_frames(self.duration_secs)),
        }
    }
}

/// A media file produced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipHandle {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Trait for media backends (ffmpeg, in-memory test doubles, ...).
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Read duration, frame rate, and dimensions of `source`.
    async fn probe(&self, source: &Path) -> PawreelResult<MediaInfo>;

    /// Cut `[window.start_secs, window.end_secs)` of `source` into `dest`.
    async fn extract(
        &self,
        source: &Path,
        window: &TimeWindow,
        dest: &Path,
    ) -> PawreelResult<ClipHandle>;

    /// Join clips in the given order into `dest`.
    async fn concatenate(&self, clips: &[ClipHandle], dest: &Path) -> PawreelResult<ClipHandle>;

    /// Move a finished output to its final location.
    async fn write(&self, output: &ClipHandle, path: &Path) -> PawreelResult<ClipHandle> {
        if output.path != path {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if tokio::fs::rename(&output.path, path).await.is_err() {
                // Rename fails across filesystems.
                tokio::fs::copy(&output.path, path).await?;
                tokio::fs::remove_file(&output.path).await?;
            }
        }
        Ok(ClipHandle {
            path: path.to_path_buf(),
            duration_secs: output.duration_secs,
        })
    }

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// `path` resolved against the current directory when it is relative.
pub fn absolute_path(path: &Path) -> PawreelResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
