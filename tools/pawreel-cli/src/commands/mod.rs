pub mod analyze;
pub mod check;
pub mod clip;
pub mod config;
pub mod overlay;
pub mod validate;
