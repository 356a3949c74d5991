//! Session state machine.
//!
//! [`SessionState`] drives the conversation controller's state machine; the
//! presentation bindings read it through
//! [`SessionEvent`](crate::session::SessionEvent) notifications.
//!
//! The state machine transitions are:
//!
//! ```text
//! Idle ──start turn──────▶ Capturing
//!      ──text submit─────▶ Processing
//! Capturing ──utterance──▶ Processing
//!           ──error/stop─▶ Idle
//! Processing ──reply─────▶ Speaking   (unmuted, playback available)
//!            ──reply─────▶ Idle       (muted or playback unavailable)
//! Speaking ──finished────▶ Idle
//!          ──cancelled───▶ Idle       (new turn start, mute toggled on)
//! any state ──failure────▶ Error ──▶ Idle  (always recovers)
//! ```
//!
//! Exactly one state is active at any instant; `Capturing` and `Speaking`
//! can never hold simultaneously because a single enum value represents the
//! whole session. Mute is an orthogonal flag owned by the controller.

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user to start a turn.
    Idle,

    /// The capture engine is listening for one utterance.
    Capturing,

    /// The grammar and inference requests for the current turn are in
    /// flight. There is no cancellation path: processing runs to completion
    /// (success or fallback) before any other operation may start.
    Processing,

    /// The reply is being spoken aloud.
    Speaking,

    /// An unrecoverable internal failure was surfaced; the controller
    /// recovers to `Idle` immediately after.
    Error,
}

impl SessionState {
    /// Returns `true` while a turn is actively in progress.
    ///
    /// ```
    /// use french_buddy::session::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_busy());
    /// assert!(SessionState::Capturing.is_busy());
    /// assert!(SessionState::Processing.is_busy());
    /// assert!(SessionState::Speaking.is_busy());
    /// assert!(!SessionState::Error.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Capturing | SessionState::Processing | SessionState::Speaking
        )
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Capturing => "Listening",
            SessionState::Processing => "Thinking",
            SessionState::Speaking => "Speaking",
            SessionState::Error => "Error",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
