//! PawReel Common Utilities
//!
//! Shared infrastructure for all PawReel crates:
//! - Error types and result aliases
//! - Frame clock for converting between frame indices and video time
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
