//! Palaver gateway - HTTP front-end for a local chat model.
//!
//! This crate implements the request surface of Palaver, handling:
//! - The `/generate` chat endpoint and its history bookkeeping
//! - Static delivery of the chat page
//! - Structured API errors
//! - Engine bootstrap and process configuration

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_routes;
pub use state::{AppState, ChatSettings};

/// Gateway version
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");
