//! Core application layer
//!
//! This module provides the shared foundation of the backend:
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{ApiError, ErrorResponse, Result};
pub use logging::Logger;
