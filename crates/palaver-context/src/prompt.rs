//! Rendering history into the model's turn-delimited prompt format.

use palaver_core::Turn;

/// Opening delimiter of one turn in the Gemma chat template.
pub const TURN_START: &str = "<start_of_turn>";

/// Closing delimiter of one turn; also the stop sequence handed to the engine.
pub const TURN_END: &str = "<end_of_turn>";

/// Trailing marker that invites the model to produce the next turn.
pub const MODEL_CUE: &str = "<start_of_turn>model\n";

/// Render turns into a model-ready prompt string.
///
/// Each turn becomes `<start_of_turn>{role}\n{content}<end_of_turn>\n`, in
/// order, followed by [`MODEL_CUE`] with no trailing content so the model
/// generates the assistant turn. Turns with empty content are skipped so a
/// malformed entry cannot corrupt the template.
///
/// Content is emitted verbatim: delimiter-like substrings inside a message
/// pass straight through into the prompt. Known limitation, kept on purpose.
pub fn render_prompt(turns: &[Turn]) -> String {
    let mut prompt = String::new();
    for turn in turns {
        if turn.content.is_empty() {
            continue;
        }
        prompt.push_str(TURN_START);
        prompt.push_str(turn.role.as_str());
        prompt.push('\n');
        prompt.push_str(&turn.content);
        prompt.push_str(TURN_END);
        prompt.push('\n');
    }
    prompt.push_str(MODEL_CUE);
    prompt
}
