//! Presentation bindings over the controller contract.
//!
//! [`TextSession`] and [`AudioSession`] are thin wrappers around the same
//! command/event channel pair; they differ only in whether speech capture is
//! wired to every turn. Both rely on the controller for playback, muting,
//! and transcript updates — no session binding ever mutates session state
//! directly.

use tokio::sync::mpsc;

use crate::session::{SessionCommand, SessionEvent};

// ---------------------------------------------------------------------------
// Conversation openers and sidebar content
// ---------------------------------------------------------------------------

/// Greeting seeded into a typed session's transcript.
pub const TEXT_GREETING: &str = "Bonjour! Je suis votre assistant français. Commencez à parler en français et je vous aiderai avec des corrections et des suggestions!";

/// Greeting seeded into a spoken session's transcript.
pub const AUDIO_GREETING: &str = "Bonjour! Je suis votre assistant français. Cliquez sur le microphone et commencez à parler en français!";

/// Ready-made phrases a learner can send as-is.
pub const QUICK_PHRASES: &[&str] = &[
    "Bonjour, comment allez-vous?",
    "Je suis en train d'apprendre le français",
    "Pouvez-vous m'aider?",
    "Qu'est-ce que vous pensez?",
    "Comment dit-on... en français?",
    "Je ne comprends pas",
];

/// Study tips shown alongside the conversation.
pub const LEARNING_TIPS: &[&str] = &[
    "🗣️ Try speaking aloud for pronunciation practice",
    "📝 Pay attention to article agreement (le/la/les)",
    "🔄 Practice verb conjugations regularly",
    "✅ Don't worry about mistakes - they help you learn!",
    "🎯 Start with simple sentences and build up",
    "📚 Use common phrases daily",
];

// ---------------------------------------------------------------------------
// TextSession
// ---------------------------------------------------------------------------

/// Typed-conversation binding: each turn is a submitted line of text.
pub struct TextSession {
    commands: mpsc::Sender<SessionCommand>,
    events: mpsc::Receiver<SessionEvent>,
}

impl TextSession {
    /// Bind to a running controller's channel endpoints.
    pub fn new(
        commands: mpsc::Sender<SessionCommand>,
        events: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self { commands, events }
    }

    /// Submit one typed utterance as a turn.
    pub async fn submit(&self, text: impl Into<String>) {
        self.send(SessionCommand::SubmitText(text.into())).await;
    }

    /// Flip spoken-reply muting.
    pub async fn toggle_mute(&self) {
        self.send(SessionCommand::ToggleMute).await;
    }

    /// Next controller event; `None` once the controller shut down.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    async fn send(&self, cmd: SessionCommand) {
        if self.commands.send(cmd).await.is_err() {
            log::warn!("session controller is gone; command dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// AudioSession
// ---------------------------------------------------------------------------

/// Spoken-conversation binding: each turn starts with a capture activation.
pub struct AudioSession {
    commands: mpsc::Sender<SessionCommand>,
    events: mpsc::Receiver<SessionEvent>,
}

impl AudioSession {
    /// Bind to a running controller's channel endpoints.
    pub fn new(
        commands: mpsc::Sender<SessionCommand>,
        events: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self { commands, events }
    }

    /// Start listening for the next utterance.
    pub async fn start_turn(&self) {
        self.send(SessionCommand::StartCapture).await;
    }

    /// Finalize the in-flight capture early.
    pub async fn stop_turn(&self) {
        self.send(SessionCommand::StopCapture).await;
    }

    /// Flip spoken-reply muting.
    pub async fn toggle_mute(&self) {
        self.send(SessionCommand::ToggleMute).await;
    }

    /// Next controller event; `None` once the controller shut down.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    async fn send(&self, cmd: SessionCommand) {
        if self.commands.send(cmd).await.is_err() {
            log::warn!("session controller is gone; command dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
