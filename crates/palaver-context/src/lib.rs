//! Palaver context management - conversation history and prompt assembly.
//!
//! This crate provides:
//! - The shared, lock-guarded conversation history
//! - Windowed reads over the trailing portion of the history
//! - Rendering of history into the model's turn-delimited prompt format

pub mod history;
pub mod prompt;

pub use history::{HistoryStore, DEFAULT_MAX_HISTORY_LEN, DEFAULT_MAX_HISTORY_TURNS};
pub use prompt::{render_prompt, MODEL_CUE, TURN_END, TURN_START};

/// Prelude for common imports
pub mod prelude {
    pub use crate::history::HistoryStore;
    pub use crate::prompt::render_prompt;
}
