//! Utilities for plot views

pub mod scales;

// Re-export commonly used items
pub use scales::{extent, LinearScale};
