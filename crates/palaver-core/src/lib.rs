//! Palaver core library - conversation domain types.

pub mod turn;

pub use turn::{Role, Turn};

/// Core crate version
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
