//! API request and response models

pub mod plugins;
pub mod stats;

pub use plugins::*;
pub use stats::*;
