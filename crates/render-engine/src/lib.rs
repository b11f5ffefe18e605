//! PawReel Render Engine
//!
//! Media side of the highlight pipeline: probes the source video, cuts the
//! highlight windows out of it, and joins them into the final reel.
//!
//! # Pipeline Architecture
//!
//! ```text
//! keypoints.jsonl ──┐
//!                   ├── Alignment check (frame counts)
//! source.mp4 ───────┘         │
//!                             ├── Highlight analysis (processing-core)
//!                             │
//!                             ├── Extract windows (bounded, timed out)
//!                             │
//!                             ├── Concatenate in chronological order
//!                             ▼
//!                        reel.mp4 + reel.mp4.highlights.json
//! ```
//!
//! Caption overlay is a separate step over a finished clip; see
//! [`overlay`].

pub mod assembler;
pub mod backend;
pub mod ffmpeg;
pub mod overlay;
pub mod pipeline;

pub use assembler::{AssemblyOptions, AssemblyReport, ClipAssembler, SkippedClip};
pub use backend::{ClipHandle, MediaBackend, MediaInfo};
pub use ffmpeg::FfmpegBackend;
pub use overlay::{
    build_drawtext_filter, run_overlay_job, select_captions, CaptionScorer, CommandCaptionScorer,
    OverlayJob, OverlayPlan, OverlayReport, OverlayStyle,
};
pub use pipeline::{load_inputs, run_highlight_job, HighlightJob, HighlightManifest, HighlightReport};
