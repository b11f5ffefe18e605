//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PawreelError, PawreelResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Highlight detection parameters.
    pub highlight: HighlightConfig,

    /// Clip extraction and encoding settings.
    pub render: RenderConfig,

    /// Caption overlay settings.
    pub overlay: OverlayConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How per-part displacements are combined into one value per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplacementAggregate {
    /// Average over the parts that were detected in both frames.
    #[default]
    Mean,
    /// Sum over the parts that were detected in both frames.
    Sum,
}

/// Placement of the rolling-average window relative to the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingAlignment {
    /// Window ends at the current frame.
    #[default]
    Trailing,
    /// Window is centered on the current frame.
    Centered,
}

/// What to do when no frame crosses the activity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyHighlightFallback {
    /// Surface `EmptyHighlight` to the caller.
    #[default]
    Fail,
    /// Emit the whole video as a single window.
    FullVideo,
}

/// What the clip assembler does when a window cannot be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    /// Abort the whole assembly on the first failed window.
    #[default]
    Abort,
    /// Log a warning, drop the window, and keep going.
    SkipWithWarning,
}

/// Highlight detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Rolling-average width in frames.
    pub rolling_window_size: usize,

    /// Standard deviations above the mean a frame must exceed.
    pub threshold_multiplier: f64,

    /// Seconds kept before each interesting frame.
    pub pre_pad_seconds: f64,

    /// Seconds kept after each interesting frame.
    pub post_pad_seconds: f64,

    /// Body parts to track. Empty means every part in the series.
    pub tracked_parts: Vec<String>,

    /// Keypoints below this confidence are treated as missing.
    pub confidence_floor: f64,

    /// Per-frame aggregation of part displacements.
    pub displacement_aggregate: DisplacementAggregate,

    /// Rolling-average alignment.
    pub smoothing_alignment: SmoothingAlignment,

    /// Allowed difference between keypoint and video frame counts.
    pub frame_tolerance: u64,

    /// Behaviour when nothing is interesting.
    pub on_empty: EmptyHighlightFallback,
}

/// Clip extraction and encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// ffmpeg executable.
    pub ffmpeg_path: String,

    /// ffprobe executable.
    pub ffprobe_path: String,

    /// Video codec used when re-encoding sub-clips.
    pub video_codec: String,

    /// Constant rate factor for re-encoding.
    pub crf: u8,

    /// Encoder preset.
    pub preset: String,

    /// Copy streams instead of re-encoding (fast, keyframe-aligned cuts).
    pub stream_copy: bool,

    /// Upper bound on a single sub-clip extraction.
    pub extraction_timeout_secs: u64,

    /// Failure policy for individual extractions.
    pub extraction_policy: ExtractionPolicy,

    /// Number of extractions allowed to run at once.
    pub max_parallel_extractions: usize,

    /// Keep the per-window intermediate files after concatenation.
    pub keep_intermediate: bool,
}

/// Caption overlay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Candidate captions scored against the clip frames.
    pub captions: Vec<String>,

    /// How many of the best captions are drawn.
    pub top_k: usize,

    /// Base caption anchors as `(x_ratio, y_ratio)` of the frame.
    pub positions: Vec<(f64, f64)>,

    /// TrueType font used for captions.
    pub font_path: Option<PathBuf>,

    /// Font size as a fraction of the frame height.
    pub font_scale: f64,

    /// Text color (RGBA).
    pub text_color: [u8; 4],

    /// Box color behind the text (RGB).
    pub bg_tint_color: [u8; 3],

    /// Box opacity in [0, 1]; 0 disables the box.
    pub bg_transparency: f64,

    /// Draw a drop shadow under the text.
    pub draw_shadow: bool,

    /// Shadow color (RGBA).
    pub shadow_color: [u8; 4],

    /// Shadow offset in pixels.
    pub shadow_offset: (i32, i32),

    /// Jiggle captions horizontally.
    pub animate: bool,

    /// Frames between animation flips.
    pub animation_interval: u64,

    /// Horizontal jiggle as a fraction of the frame width.
    pub animation_offset: f64,

    /// Score every Nth frame of the clip.
    pub frame_interval: u64,

    /// External similarity scorer (program plus arguments).
    pub scorer_command: Vec<String>,

    /// Timeout for one scorer run over all sampled frames, in seconds.
    pub scorer_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pawreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            rolling_window_size: 5,
            threshold_multiplier: 0.5,
            pre_pad_seconds: 0.2,
            post_pad_seconds: 0.2,
            tracked_parts: Vec::new(),
            confidence_floor: 0.0,
            displacement_aggregate: DisplacementAggregate::Mean,
            smoothing_alignment: SmoothingAlignment::Trailing,
            frame_tolerance: 1,
            on_empty: EmptyHighlightFallback::Fail,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_codec: "libx264".to_string(),
            crf: 20,
            preset: "medium".to_string(),
            stream_copy: false,
            extraction_timeout_secs: 120,
            extraction_policy: ExtractionPolicy::Abort,
            max_parallel_extractions: 1,
            keep_intermediate: false,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            captions: [
                "Cute!",
                "Playing!",
                "So adorable!",
                "Having fun!",
                "A happy moment.",
                "Look at that activity!",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            top_k: 2,
            positions: vec![(0.2, 0.15), (0.8, 0.25)],
            font_path: None,
            font_scale: 0.05,
            text_color: [255, 255, 255, 255],
            bg_tint_color: [0, 0, 0],
            bg_transparency: 0.0,
            draw_shadow: true,
            shadow_color: [0, 0, 0, 128],
            shadow_offset: (5, 5),
            animate: false,
            animation_interval: 10,
            animation_offset: 0.05,
            frame_interval: 1,
            scorer_command: Vec::new(),
            scorer_timeout_secs: 600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl HighlightConfig {
    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> PawreelResult<()> {
        if self.rolling_window_size == 0 {
            return Err(PawreelError::config("rolling_window_size must be at least 1"));
        }
        if !self.threshold_multiplier.is_finite() || self.threshold_multiplier < 0.0 {
            return Err(PawreelError::config(format!(
                "threshold_multiplier must be a finite value >= 0, got {}",
                self.threshold_multiplier
            )));
        }
        for (name, pad) in [
            ("pre_pad_seconds", self.pre_pad_seconds),
            ("post_pad_seconds", self.post_pad_seconds),
        ] {
            if !pad.is_finite() || pad < 0.0 {
                return Err(PawreelError::config(format!(
                    "{name} must be a finite value >= 0, got {pad}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(PawreelError::config(format!(
                "confidence_floor must be in [0, 1], got {}",
                self.confidence_floor
            )));
        }
        Ok(())
    }
}

impl RenderConfig {
    pub fn validate(&self) -> PawreelResult<()> {
        if self.extraction_timeout_secs == 0 {
            return Err(PawreelError::config("extraction_timeout_secs must be positive"));
        }
        if self.max_parallel_extractions == 0 {
            return Err(PawreelError::config(
                "max_parallel_extractions must be at least 1",
            ));
        }
        Ok(())
    }
}

impl OverlayConfig {
    pub fn validate(&self) -> PawreelResult<()> {
        if self.captions.is_empty() {
            return Err(PawreelError::config("at least one caption candidate is required"));
        }
        if self.top_k == 0 || self.top_k > self.positions.len() {
            return Err(PawreelError::config(format!(
                "top_k must be between 1 and the number of positions ({})",
                self.positions.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.bg_transparency) {
            return Err(PawreelError::config("bg_transparency must be in [0, 1]"));
        }
        if self.animation_interval == 0 || self.frame_interval == 0 {
            return Err(PawreelError::config(
                "animation_interval and frame_interval must be positive",
            ));
        }
        if self.scorer_timeout_secs == 0 {
            return Err(PawreelError::config("scorer_timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> PawreelResult<Self> {
        if !path.exists() {
            return Err(PawreelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PawreelError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    /// Validate every section.
    pub fn validate(&self) -> PawreelResult<()> {
        self.highlight.validate()?;
        self.render.validate()?;
        self.overlay.validate()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("pawreel").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.highlight.rolling_window_size, 5);
        assert_eq!(config.overlay.captions.len(), 6);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"highlight": {"threshold_multiplier": 2.0, "tracked_parts": ["nose"]}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.highlight.threshold_multiplier, 2.0);
        assert_eq!(config.highlight.tracked_parts, vec!["nose".to_string()]);
        assert_eq!(config.highlight.rolling_window_size, 5);
        assert_eq!(config.render.extraction_policy, ExtractionPolicy::Abort);
    }

    #[test]
    fn test_enum_spelling() {
        let json = r#"{"render": {"extraction_policy": "skip_with_warning"},
                       "highlight": {"smoothing_alignment": "centered", "on_empty": "full_video"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.render.extraction_policy,
            ExtractionPolicy::SkipWithWarning
        );
        assert_eq!(
            config.highlight.smoothing_alignment,
            SmoothingAlignment::Centered
        );
        assert_eq!(config.highlight.on_empty, EmptyHighlightFallback::FullVideo);
    }

    #[test]
    fn test_highlight_validation() {
        let mut config = HighlightConfig::default();
        config.rolling_window_size = 0;
        assert!(config.validate().is_err());

        let mut config = HighlightConfig::default();
        config.threshold_multiplier = -0.1;
        assert!(config.validate().is_err());

        let mut config = HighlightConfig::default();
        config.pre_pad_seconds = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = HighlightConfig::default();
        config.confidence_floor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_render_and_overlay_validation() {
        let mut render = RenderConfig::default();
        render.max_parallel_extractions = 0;
        assert!(render.validate().is_err());

        let mut overlay = OverlayConfig::default();
        overlay.top_k = 3;
        assert!(overlay.validate().is_err());

        let mut overlay = OverlayConfig::default();
        overlay.scorer_timeout_secs = 0;
        assert!(overlay.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = AppConfig::load_from(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, PawreelError::FileNotFound { .. }));
    }
}
