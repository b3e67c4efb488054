//! REST API module
//!
//! This module provides the HTTP server and REST API endpoints including:
//! - API routing and plugin dispatch
//! - Rate limiting and request tracking middleware
//! - Error handling and response formatting

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use middleware::{RateLimiter, rate_limit_middleware, track_requests};
pub use server::ApiServer;
