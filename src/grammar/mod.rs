//! Remote grammar analysis.
//!
//! This module provides:
//! * [`GrammarAnalyzer`] — async trait implemented by analyzer backends.
//! * [`ApiAnalyzer`] — HTTP client for a LanguageTool-style check endpoint.
//! * [`Feedback`] — rendered corrections and encouragement strings attached
//!   to a user message.
//! * [`GrammarError`] — error variants; any of them degrades a turn's
//!   feedback to empty rather than blocking the reply.

pub mod analyzer;
pub mod feedback;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use analyzer::{ApiAnalyzer, GrammarAnalyzer, GrammarError};
pub use feedback::{Feedback, GrammarMatch, Replacement, FULL_SENTENCE_PRAISE};
