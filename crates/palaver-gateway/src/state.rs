//! Shared request-handler state.

use std::path::PathBuf;
use std::sync::Arc;

use palaver_context::{HistoryStore, DEFAULT_MAX_HISTORY_LEN, DEFAULT_MAX_HISTORY_TURNS, TURN_END};
use palaver_engine::{CompletionEngine, CompletionParams};

/// Fixed chat behavior applied to every request.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Exchanges included in each prompt window.
    pub max_history_turns: usize,
    /// Turns retained after pruning.
    pub max_history_len: usize,
    /// Generation parameters handed to the engine.
    pub params: CompletionParams,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
            max_history_len: DEFAULT_MAX_HISTORY_LEN,
            params: CompletionParams {
                stop: vec![TURN_END.to_string()],
                ..CompletionParams::default()
            },
        }
    }
}

/// State shared by all request handlers.
///
/// The history is the single process-wide conversation; the engine is
/// `None` when startup initialization failed, in which case `/generate`
/// reports unavailability instead of crashing the process.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<HistoryStore>,
    pub engine: Option<Arc<dyn CompletionEngine>>,
    pub settings: Arc<ChatSettings>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(
        engine: Option<Arc<dyn CompletionEngine>>,
        settings: ChatSettings,
        static_dir: PathBuf,
    ) -> Self {
        Self {
            history: Arc::new(HistoryStore::new()),
            engine,
            settings: Arc::new(settings),
            static_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_fixed_chat_behavior() {
        let settings = ChatSettings::default();
        assert_eq!(settings.max_history_turns, 5);
        assert_eq!(settings.max_history_len, 20);
        assert_eq!(settings.params.stop, vec![TURN_END.to_string()]);
    }

    #[tokio::test]
    async fn new_state_starts_with_empty_history() {
        let state = AppState::new(None, ChatSettings::default(), PathBuf::from("static"));
        assert!(state.history.is_empty().await);
        assert!(state.engine.is_none());
    }
}
