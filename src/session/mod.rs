//! Conversation session orchestration.
//!
//! This module wires capture, remote inference, grammar analysis, and
//! playback into non-overlapping conversational turns:
//!
//! * [`SessionState`] — the per-session state machine.
//! * [`ConversationController`] — the orchestration core and sole mutator of
//!   session state and transcript.
//! * [`SessionCommand`] / [`SessionEvent`] — the channel contract between
//!   the controller task and the presentation bindings.

pub mod controller;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{ConversationController, SessionCommand, SessionEvent, StatusKind};
pub use state::SessionState;
