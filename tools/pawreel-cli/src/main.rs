//! PawReel CLI: command-line interface for pet highlight reels.
//!
//! Usage:
//!   pawreel analyze <KEYPOINTS> --fps <F>   Print highlight windows
//!   pawreel clip <VIDEO> <KEYPOINTS>        Cut a highlight reel
//!   pawreel validate <VIDEO> <KEYPOINTS>    Check that inputs line up
//!   pawreel overlay <CLIP> --scorer <CMD>   Burn the best captions into a clip
//!   pawreel check                           Check ffmpeg availability
//!   pawreel config                          Show effective configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pawreel_common::config::{
    AppConfig, DisplacementAggregate, EmptyHighlightFallback, ExtractionPolicy, HighlightConfig,
    SmoothingAlignment,
};

mod commands;

#[derive(Parser)]
#[command(
    name = "pawreel",
    about = "Motion-based highlight reels from pet videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the highlight detection parameters.
#[derive(Args, Debug)]
struct HighlightArgs {
    /// Rolling window size in frames
    #[arg(long)]
    window: Option<usize>,

    /// Threshold multiplier k in mean + k * stddev
    #[arg(long)]
    threshold: Option<f64>,

    /// Seconds kept before each interesting frame
    #[arg(long)]
    pre_pad: Option<f64>,

    /// Seconds kept after each interesting frame
    #[arg(long)]
    post_pad: Option<f64>,

    /// Body part to track (repeatable; default: all)
    #[arg(long = "part")]
    parts: Vec<String>,

    /// Ignore keypoints below this confidence
    #[arg(long)]
    confidence_floor: Option<f64>,

    /// Displacement aggregation across parts: mean|sum
    #[arg(long)]
    aggregate: Option<String>,

    /// Smoothing window alignment: trailing|centered
    #[arg(long)]
    alignment: Option<String>,

    /// Allowed keypoint/video frame count difference
    #[arg(long)]
    tolerance: Option<u64>,

    /// What to do when nothing is interesting: fail|full-video
    #[arg(long)]
    on_empty: Option<String>,
}

impl HighlightArgs {
    fn apply(&self, config: &mut HighlightConfig) -> anyhow::Result<()> {
        if let Some(window) = self.window {
            config.rolling_window_size = window;
        }
        if let Some(threshold) = self.threshold {
            config.threshold_multiplier = threshold;
        }
        if let Some(pre) = self.pre_pad {
            config.pre_pad_seconds = pre;
        }
        if let Some(post) = self.post_pad {
            config.post_pad_seconds = post;
        }
        if !self.parts.is_empty() {
            config.tracked_parts = self.parts.clone();
        }
        if let Some(floor) = self.confidence_floor {
            config.confidence_floor = floor;
        }
        if let Some(aggregate) = &self.aggregate {
            config.displacement_aggregate = match aggregate.as_str() {
                "mean" => DisplacementAggregate::Mean,
                "sum" => DisplacementAggregate::Sum,
                _ => return Err(anyhow::anyhow!("Unknown aggregate: {aggregate}. Use: mean, sum")),
            };
        }
        if let Some(alignment) = &self.alignment {
            config.smoothing_alignment = match alignment.as_str() {
                "trailing" => SmoothingAlignment::Trailing,
                "centered" => SmoothingAlignment::Centered,
                _ => {
                    return Err(anyhow::anyhow!(
                        "Unknown alignment: {alignment}. Use: trailing, centered"
                    ))
                }
            };
        }
        if let Some(tolerance) = self.tolerance {
            config.frame_tolerance = tolerance;
        }
        if let Some(on_empty) = &self.on_empty {
            config.on_empty = match on_empty.as_str() {
                "fail" => EmptyHighlightFallback::Fail,
                "full-video" => EmptyHighlightFallback::FullVideo,
                _ => {
                    return Err(anyhow::anyhow!(
                        "Unknown fallback: {on_empty}. Use: fail, full-video"
                    ))
                }
            };
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the highlight windows of a keypoint file
    Analyze {
        /// Keypoint file (JSONL)
        keypoints: PathBuf,

        /// Video frame rate
        #[arg(long)]
        fps: f64,

        /// Video duration in seconds (default: keypoint frames / fps)
        #[arg(long)]
        duration: Option<f64>,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        highlight: HighlightArgs,
    },

    /// Cut a highlight reel out of a video
    Clip {
        /// Source video
        video: PathBuf,

        /// Keypoint file (JSONL) for the video
        keypoints: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        highlight: HighlightArgs,

        /// On extraction failure: abort|skip
        #[arg(long)]
        policy: Option<String>,

        /// Per-clip extraction timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Concurrent extractions
        #[arg(long)]
        parallel: Option<usize>,

        /// Copy streams instead of re-encoding
        #[arg(long)]
        stream_copy: bool,

        /// Keep intermediate clips
        #[arg(long)]
        keep_intermediate: bool,
    },

    /// Check that a video and its keypoints line up
    Validate {
        /// Source video
        video: PathBuf,

        /// Keypoint file (JSONL)
        keypoints: PathBuf,

        /// Allowed frame count difference
        #[arg(long)]
        tolerance: Option<u64>,
    },

    /// Burn the best-matching captions into a clip
    Overlay {
        /// Clip to caption
        clip: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Scorer command line, e.g. --scorer python3 score.py (must come last)
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        scorer: Vec<String>,

        /// Caption candidate (repeatable; replaces the configured list)
        #[arg(long = "caption")]
        captions: Vec<String>,

        /// Number of captions to draw
        #[arg(long)]
        top_k: Option<usize>,

        /// Score every n-th frame
        #[arg(long)]
        frame_interval: Option<u64>,

        /// Sway captions left and right
        #[arg(long)]
        animate: bool,

        /// Font file for the captions
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Check system capabilities
    Check,

    /// Show the effective configuration
    Config {
        /// Write it to the user config location
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    pawreel_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Analyze {
            keypoints,
            fps,
            duration,
            json,
            highlight,
        } => {
            highlight.apply(&mut config.highlight)?;
            commands::analyze::run(keypoints, fps, duration, json, config.highlight)
        }
        Commands::Clip {
            video,
            keypoints,
            output,
            highlight,
            policy,
            timeout,
            parallel,
            stream_copy,
            keep_intermediate,
        } => {
            highlight.apply(&mut config.highlight)?;
            if let Some(policy) = policy {
                config.render.extraction_policy = match policy.as_str() {
                    "abort" => ExtractionPolicy::Abort,
                    "skip" => ExtractionPolicy::SkipWithWarning,
                    _ => return Err(anyhow::anyhow!("Unknown policy: {policy}. Use: abort, skip")),
                };
            }
            if let Some(timeout) = timeout {
                config.render.extraction_timeout_secs = timeout;
            }
            if let Some(parallel) = parallel {
                config.render.max_parallel_extractions = parallel;
            }
            config.render.stream_copy |= stream_copy;
            config.render.keep_intermediate |= keep_intermediate;
            commands::clip::run(video, keypoints, output, config).await
        }
        Commands::Validate {
            video,
            keypoints,
            tolerance,
        } => {
            let tolerance = tolerance.unwrap_or(config.highlight.frame_tolerance);
            commands::validate::run(video, keypoints, tolerance, config.render).await
        }
        Commands::Overlay {
            clip,
            output,
            scorer,
            captions,
            top_k,
            frame_interval,
            animate,
            font,
        } => {
            if !scorer.is_empty() {
                config.overlay.scorer_command = scorer;
            }
            if !captions.is_empty() {
                config.overlay.captions = captions;
            }
            if let Some(top_k) = top_k {
                config.overlay.top_k = top_k;
            }
            if let Some(interval) = frame_interval {
                config.overlay.frame_interval = interval;
            }
            if font.is_some() {
                config.overlay.font_path = font;
            }
            config.overlay.animate |= animate;
            commands::overlay::run(clip, output, config).await
        }
        Commands::Check => commands::check::run(&config.render),
        Commands::Config { save } => commands::config::run(&config, save),
    }
}
