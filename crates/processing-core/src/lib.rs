//! PawReel Processing Core: highlight detection
//!
//! Turns a keypoint series into the time windows worth keeping:
//! - **Motion signal:** Smoothed per-frame keypoint displacement
//! - **Threshold:** Frames whose activity exceeds `mean + k * stddev`
//! - **Windows:** Padded, clamped, and merged time ranges around those frames
//!
//! This crate is pure computation: no I/O, no media dependencies.
//! All inputs are data; all outputs are data.

pub mod highlight;
pub mod motion;
pub mod threshold;
pub mod windows;

pub use highlight::{HighlightAnalysis, HighlightAnalyzer};
pub use motion::MotionSignalBuilder;
pub use threshold::{ActivityStats, ActivityThresholder};
pub use windows::WindowBuilder;
