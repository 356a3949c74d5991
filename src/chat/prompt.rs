//! Chat wire format and the fixed conversation prompt.
//!
//! The generator is called with `(history, user_input)` — the transcript as
//! it existed before the current turn, plus the new utterance as a separate
//! argument. [`build_messages`] normalizes both into the single
//! `{role, content}` message list the upstream service expects: the fixed
//! system prompt first, then the history, then the new user message.

use serde::Serialize;

use crate::transcript::{Message, Speaker};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed system prompt: a friendly French conversation partner that only
/// answers in French. Not configurable.
pub const SYSTEM_PROMPT: &str = "Tu es un partenaire de conversation en français, amical et encourageant. Réponds toujours en français.";

/// Fixed reply substituted whenever the upstream service is unreachable or
/// returns an unusable payload. The turn still commits with this text.
pub const FALLBACK_REPLY: &str = "Désolé, je n'ai pas compris.";

// ---------------------------------------------------------------------------
// ChatTurn
// ---------------------------------------------------------------------------

/// One `{role, content}` entry of the upstream message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        let role = match message.speaker {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        };
        Self {
            role,
            content: message.text.clone(),
        }
    }
}

/// Assemble the full upstream message list for one turn.
///
/// `history` is the committed transcript *before* this turn; `user_input` is
/// the new utterance, never pre-inserted into the history.
pub fn build_messages(history: &[Message], user_input: &str) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatTurn {
        role: "system",
        content: SYSTEM_PROMPT.to_string(),
    });
    messages.extend(history.iter().map(ChatTurn::from));
    messages.push(ChatTurn {
        role: "user",
        content: user_input.to_string(),
    });
    messages
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
