//! Speech capture and playback adapters.
//!
//! The host speech facilities (microphone-to-text, text-to-audio) are opaque
//! external services behind the [`CaptureEngine`] and [`PlaybackEngine`]
//! traits. The adapters [`SpeechCapture`] and [`SpeechPlayback`] wrap an
//! engine and enforce the session-level contracts:
//!
//! * capture: at most one outstanding activation, exactly one terminal event
//!   per activation, idempotent `deactivate`;
//! * playback: at most one active utterance (a new `speak` cancels the
//!   previous one), idempotent `cancel`, no completion event for a cancelled
//!   utterance.
//!
//! Engine callbacks are reframed as single-shot asynchronous operations: an
//! activation yields a [`CaptureHandle`], a `speak` yields a
//! [`PlaybackHandle`], and each handle resolves to exactly one tagged
//! outcome observed via structured await.

pub mod capture;
pub mod playback;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use capture::{CaptureEngine, CaptureHandle, CaptureOutcome, SpeechCapture};
pub use playback::{PlaybackEngine, PlaybackHandle, PlaybackOutcome, PlaybackParams, SpeechPlayback};

#[cfg(test)]
pub use capture::MockCaptureEngine;
#[cfg(test)]
pub use playback::MockPlaybackEngine;

use thiserror::Error;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors rejected at the adapter boundary. State is unchanged when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// The engine is unavailable on this host; the feature is disabled.
    #[error("speech engine is not available on this host")]
    Unsupported,

    /// An activation or utterance is already outstanding.
    #[error("a speech operation is already active")]
    AlreadyActive,
}
