//! Remote reply generation.
//!
//! This module provides:
//! * [`ResponseGenerator`] — async trait implemented by all reply backends.
//! * [`ApiGenerator`] — chat-completions HTTP client with the fixed French
//!   conversation-partner system prompt.
//! * [`FallbackGenerator`] — wraps any generator; substitutes the fixed
//!   fallback reply on failure so a turn never stalls.
//! * [`ChatError`] — error variants for reply generation.
//! * [`prompt`] — system prompt, fallback string, and wire-format
//!   normalization of the transcript history.

pub mod fallback;
pub mod generator;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use fallback::FallbackGenerator;
pub use generator::{ApiGenerator, ChatError, ResponseGenerator};
pub use prompt::{build_messages, ChatTurn, FALLBACK_REPLY, SYSTEM_PROMPT};
