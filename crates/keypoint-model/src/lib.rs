//! PawReel Keypoint Model
//!
//! Defines the core data contracts for the highlight pipeline:
//! - **Keypoints:** Per-frame body-part positions from an upstream pose model
//! - **Windows:** Half-open time ranges `[start, end)` in video seconds
//! - **Clips:** The ordered extraction requests handed to the media backend
//!
//! Every value here is immutable once built. Stages transform one value
//! into the next; nothing is shared or mutated in place.

pub mod clip;
pub mod keypoints;
pub mod window;

pub use clip::*;
pub use keypoints::*;
pub use window::*;
