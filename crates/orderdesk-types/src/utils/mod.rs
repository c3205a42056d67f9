//! Utility functions and constants shared across the workspace.

pub mod constants;
pub mod formatting;

pub use formatting::{display_name, format_display_time};
