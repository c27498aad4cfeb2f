//! Shared conversation history.

use tokio::sync::RwLock;

use palaver_core::Turn;

/// Default number of user/assistant exchanges included in a prompt window.
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 5;

/// Default maximum number of turns retained after pruning.
pub const DEFAULT_MAX_HISTORY_LEN: usize = 20;

/// The single process-wide conversation history.
///
/// All requests read and mutate the same ordered sequence of turns. Every
/// operation takes the internal lock briefly and individually, so the slow
/// completion call never runs under it; two in-flight requests may interleave
/// their user-turn appends, which is why rollback compares the tail by value
/// instead of popping unconditionally.
#[derive(Debug, Default)]
pub struct HistoryStore {
    turns: RwLock<Vec<Turn>>,
}

impl HistoryStore {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn at the tail. Growth between prunes is unbounded.
    pub async fn append(&self, turn: Turn) {
        self.turns.write().await.push(turn);
    }

    /// Trailing slice of at most `2 * max_turns + 1` turns, most recent last.
    ///
    /// The `+1` keeps the just-appended user turn in view alongside
    /// `max_turns` full exchanges. Read-only.
    pub async fn window(&self, max_turns: usize) -> Vec<Turn> {
        let turns = self.turns.read().await;
        let keep = 2 * max_turns + 1;
        let start = turns.len().saturating_sub(keep);
        turns[start..].to_vec()
    }

    /// Truncate from the front so that at most `max_len` turns remain.
    /// Returns the number of turns dropped.
    pub async fn prune(&self, max_len: usize) -> usize {
        let mut turns = self.turns.write().await;
        let excess = turns.len().saturating_sub(max_len);
        if excess > 0 {
            turns.drain(..excess);
            tracing::info!(dropped = excess, len = turns.len(), "pruned history");
        }
        excess
    }

    /// Remove the tail turn iff it value-equals `expected`.
    ///
    /// Compensates for a user turn appended optimistically before a failed
    /// generation. When a concurrent request's turn has raced to the tail
    /// this is a no-op; removing anything else would corrupt that request's
    /// history.
    pub async fn rollback_if_tail(&self, expected: &Turn) -> bool {
        let mut turns = self.turns.write().await;
        if turns.last() == Some(expected) {
            turns.pop();
            true
        } else {
            false
        }
    }

    /// Number of turns currently held.
    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }

    /// Full copy of the history, oldest first.
    pub async fn snapshot(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }
}
