//! Append-only conversation history.
//!
//! [`TranscriptStore`] is the ordered record of a session: insertion order is
//! turn order is causal order. A user utterance and its resulting assistant
//! reply are always appended together through [`TranscriptStore::commit_turn`],
//! so no reader of committed state ever observes a user message without its
//! assistant counterpart.
//!
//! The store is owned by the conversation controller, which is its sole
//! mutator; presentation layers only ever see committed messages.

use std::time::SystemTime;

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    /// The learner practicing French.
    User,
    /// The conversation partner.
    Assistant,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One committed conversational message.
///
/// `text` is immutable once created. `corrections` and `suggestions` are
/// empty unless the speaker is [`Speaker::User`] and grammar analysis ran for
/// the turn; they are attached before the message becomes visible, never
/// afterwards.
#[derive(Debug, Clone)]
pub struct Message {
    /// Monotonically increasing sequence number, unique within a session.
    pub id: u64,
    /// Who produced the message.
    pub speaker: Speaker,
    /// The spoken or typed content.
    pub text: String,
    /// Creation time, informational only.
    pub timestamp: SystemTime,
    /// Grammar corrections rendered as human-readable strings.
    pub corrections: Vec<String>,
    /// Encouragement / tip strings.
    pub suggestions: Vec<String>,
}

impl Message {
    fn new(id: u64, speaker: Speaker, text: String) -> Self {
        Self {
            id,
            speaker,
            text,
            timestamp: SystemTime::now(),
            corrections: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptStore
// ---------------------------------------------------------------------------

/// Ordered, append-only sequence of [`Message`]s.
///
/// # Invariants
///
/// * Observers see messages strictly in commit order.
/// * A User/Assistant pair commits atomically: both messages are appended
///   inside a single `&mut` call, so no intermediate state with a lone user
///   message is ever reachable.
/// * Ids are monotonically increasing and never reused.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
    next_id: u64,
}

impl TranscriptStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Append a session-opening assistant greeting.
    ///
    /// A greeting is a lone assistant message preceding turn pairing; it is
    /// the only message that commits outside of a pair.
    pub fn push_greeting(&mut self, text: impl Into<String>) -> Message {
        let id = self.next_id();
        let message = Message::new(id, Speaker::Assistant, text.into());
        self.messages.push(message.clone());
        message
    }

    /// Commit one full turn: the user utterance (carrying its grammar
    /// feedback) and the resulting assistant reply, as one atomic pair.
    ///
    /// Returns clones of both committed messages, in commit order.
    pub fn commit_turn(
        &mut self,
        user_text: impl Into<String>,
        corrections: Vec<String>,
        suggestions: Vec<String>,
        reply_text: impl Into<String>,
    ) -> (Message, Message) {
        let user_id = self.next_id();
        let mut user = Message::new(user_id, Speaker::User, user_text.into());
        user.corrections = corrections;
        user.suggestions = suggestions;

        let assistant_id = self.next_id();
        let assistant = Message::new(assistant_id, Speaker::Assistant, reply_text.into());

        self.messages.push(user.clone());
        self.messages.push(assistant.clone());

        (user, assistant)
    }

    /// All committed messages, in commit order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Clone of the current history — what the reply generator receives for
    /// the *next* turn (the in-flight utterance is never pre-inserted).
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Number of committed messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// `true` when no message has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_empty() {
        let store = TranscriptStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn commit_turn_appends_pair_in_order() {
        let mut store = TranscriptStore::new();
        let (user, assistant) =
            store.commit_turn("Bonjour", Vec::new(), Vec::new(), "Salut ! Ça va ?");

        assert_eq!(store.len(), 2);
        assert_eq!(user.speaker, Speaker::User);
        assert_eq!(assistant.speaker, Speaker::Assistant);
        assert_eq!(store.messages()[0].id, user.id);
        assert_eq!(store.messages()[1].id, assistant.id);
        assert_eq!(store.messages()[0].text, "Bonjour");
        assert_eq!(store.messages()[1].text, "Salut ! Ça va ?");
    }

    #[test]
    fn ids_are_monotonic_across_turns() {
        let mut store = TranscriptStore::new();
        store.push_greeting("Bonjour!");
        store.commit_turn("a", Vec::new(), Vec::new(), "b");
        store.commit_turn("c", Vec::new(), Vec::new(), "d");

        let ids: Vec<u64> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn feedback_attaches_to_user_message_only() {
        let mut store = TranscriptStore::new();
        let (user, assistant) = store.commit_turn(
            "je vais bien",
            vec!["correction".into()],
            vec!["suggestion".into()],
            "Très bien !",
        );

        assert_eq!(user.corrections, vec!["correction".to_string()]);
        assert_eq!(user.suggestions, vec!["suggestion".to_string()]);
        assert!(assistant.corrections.is_empty());
        assert!(assistant.suggestions.is_empty());
    }

    #[test]
    fn greeting_is_lone_assistant_message() {
        let mut store = TranscriptStore::new();
        let greeting = store.push_greeting("Bonjour!");

        assert_eq!(store.len(), 1);
        assert_eq!(greeting.id, 1);
        assert_eq!(greeting.speaker, Speaker::Assistant);
        assert!(greeting.corrections.is_empty());
    }

    /// The snapshot taken before a commit must not contain the turn that
    /// commits afterwards.
    #[test]
    fn snapshot_excludes_uncommitted_turn() {
        let mut store = TranscriptStore::new();
        store.push_greeting("Bonjour!");

        let before = store.snapshot();
        store.commit_turn("Bonjour", Vec::new(), Vec::new(), "Salut !");

        assert_eq!(before.len(), 1);
        assert_eq!(store.len(), 3);
    }

    /// Committed turns alternate User/Assistant after the greeting — there is
    /// no reachable state with an unpaired user message.
    #[test]
    fn pairs_are_never_split() {
        let mut store = TranscriptStore::new();
        store.push_greeting("Bonjour!");
        for i in 0..5 {
            store.commit_turn(format!("u{i}"), Vec::new(), Vec::new(), format!("a{i}"));
        }

        let speakers: Vec<Speaker> = store.messages()[1..].iter().map(|m| m.speaker).collect();
        for pair in speakers.chunks(2) {
            assert_eq!(pair, [Speaker::User, Speaker::Assistant]);
        }
    }
}
