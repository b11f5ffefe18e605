//! Highlight analysis: keypoints in, merged highlight windows out.
//!
//! Runs the motion, threshold, and window stages in order. Each stage
//! consumes the complete output of the previous one.

use pawreel_common::clock::FrameClock;
use pawreel_common::config::HighlightConfig;
use pawreel_common::error::{PawreelError, PawreelResult};
use pawreel_keypoint_model::clip::ClipSequence;
use pawreel_keypoint_model::keypoints::KeypointSeries;
use pawreel_keypoint_model::window::{total_duration, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::motion::MotionSignalBuilder;
use crate::threshold::{ActivityStats, ActivityThresholder};
use crate::windows::WindowBuilder;

/// Everything the analysis computed, kept for diagnostics and manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightAnalysis {
    /// Per-frame displacement before smoothing.
    pub raw_displacement: Vec<f64>,
    /// Smoothed activity signal.
    pub activity: Vec<f64>,
    /// Statistics of the activity signal.
    pub stats: Option<ActivityStats>,
    /// Cut-off a frame had to exceed.
    pub threshold: f64,
    /// Sorted interesting frame indices.
    pub interesting_frames: Vec<usize>,
    /// Merged highlight windows.
    pub windows: Vec<TimeWindow>,
    /// Duration the windows were clamped to.
    pub duration_secs: f64,
}

impl HighlightAnalysis {
    /// Whether nothing crossed the threshold.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Running time of the highlight reel.
    pub fn highlight_duration_secs(&self) -> f64 {
        total_duration(&self.windows)
    }

    /// Turn the windows into extraction requests.
    ///
    /// An empty result is reported as `EmptyHighlight` so callers must
    /// decide on a fallback explicitly.
    pub fn clip_sequence(&self) -> PawreelResult<ClipSequence> {
        if self.windows.is_empty() {
            return Err(PawreelError::empty_highlight(
                self.activity.len(),
                self.threshold,
            ));
        }
        Ok(ClipSequence::from_windows(&self.windows))
    }
}

/// The highlight analyzer.
pub struct HighlightAnalyzer {
    config: HighlightConfig,
}

impl HighlightAnalyzer {
    /// Create an analyzer, validating the configuration up front.
    pub fn new(config: HighlightConfig) -> PawreelResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create an analyzer with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: HighlightConfig::default(),
        }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Analyze a keypoint series against a video of `duration_secs`.
    ///
    /// Never fails because nothing was interesting; check
    /// [`HighlightAnalysis::is_empty`] or call
    /// [`HighlightAnalysis::clip_sequence`].
    pub fn analyze(
        &self,
        series: &KeypointSeries,
        clock: &FrameClock,
        duration_secs: f64,
    ) -> PawreelResult<HighlightAnalysis> {
        let motion = MotionSignalBuilder::from_config(&self.config);
        let raw_displacement = motion.raw_displacement(series, &self.config.tracked_parts)?;
        let activity = motion.smooth(&raw_displacement);

        let selection = ActivityThresholder::new(self.config.threshold_multiplier)?.select(&activity);

        let windows = WindowBuilder::from_config(&self.config).build_windows(
            &selection.frames,
            clock,
            duration_secs,
        );

        tracing::info!(
            frames = series.len(),
            interesting_frames = selection.frames.len(),
            windows = windows.len(),
            threshold = selection.threshold,
            highlight_secs = total_duration(&windows),
            "Highlight analysis complete"
        );

        Ok(HighlightAnalysis {
            raw_displacement,
            activity,
            stats: selection.stats,
            threshold: selection.threshold,
            interesting_frames: selection.frames,
            windows,
            duration_secs,
        })
    }
}
