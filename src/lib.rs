//! French conversation practice engine.
//!
//! The crate orchestrates one conversational turn at a time: speech or text
//! capture, remote reply generation, grammar feedback, and spoken playback,
//! sequenced so that no two of them ever overlap.
//!
//! # Architecture
//!
//! ```text
//! SessionCommand (mpsc)
//!        │
//!        ▼
//! ConversationController::run()  ← async tokio task, sole state mutator
//!        │
//!        ├─ StartCapture   → SpeechCapture::activate()        [Capturing]
//!        │     └─ Utterance(text)
//!        │           ├─ GrammarAnalyzer::analyze  ┐ concurrent [Processing]
//!        │           ├─ ResponseGenerator::generate┘
//!        │           ├─ TranscriptStore::commit_turn (atomic pair)
//!        │           └─ SpeechPlayback::speak (unless muted)   [Speaking]
//!        │
//!        └─ SubmitText(t) → same flow, bypassing Capturing
//!
//! SessionEvent (mpsc) ──▶ read by the mode bindings / console UI
//! ```
//!
//! The remote inference and grammar services, and the host speech engines,
//! are external boundaries: HTTP clients behind [`chat::ResponseGenerator`]
//! and [`grammar::GrammarAnalyzer`], and host facilities behind
//! [`speech::CaptureEngine`] and [`speech::PlaybackEngine`]. Their failures
//! never stall a turn — replies degrade to a fixed fallback string and
//! grammar feedback degrades to empty.

pub mod chat;
pub mod config;
pub mod grammar;
pub mod mode;
pub mod session;
pub mod speech;
pub mod transcript;
