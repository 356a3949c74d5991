//! Grammar feedback rendering.
//!
//! The check endpoint returns a list of matches, each optionally carrying a
//! best replacement. [`Feedback::from_matches`] renders every match into one
//! human-readable correction string and adds the full-sentence encouragement
//! when the utterance is long enough.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One replacement proposed for a match.
#[derive(Debug, Clone, Deserialize)]
pub struct Replacement {
    pub value: String,
}

/// One grammar issue reported by the check endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarMatch {
    pub message: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

impl GrammarMatch {
    /// Render the match as a single correction string: the message, plus the
    /// best replacement as a concrete "try this" when one exists.
    pub fn render(&self) -> String {
        match self.replacements.first() {
            Some(replacement) => {
                format!("{} → Essayez: \"{}\"", self.message, replacement.value)
            }
            None => self.message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// Encouragement added when the utterance runs past
/// [`FULL_SENTENCE_MIN_WORDS`] words.
pub const FULL_SENTENCE_PRAISE: &str = "Super phrase complète !";

/// Word count above which an utterance earns the full-sentence praise.
const FULL_SENTENCE_MIN_WORDS: usize = 5;

/// Corrections and suggestions for one user utterance.
///
/// `Default` is the degraded form used when the grammar service fails: the
/// turn proceeds with no feedback rather than blocking the reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feedback {
    /// Rendered correction strings, in the order the service reported them.
    pub corrections: Vec<String>,
    /// Encouragement / tip strings.
    pub suggestions: Vec<String>,
}

impl Feedback {
    /// Render the service's matches for `text` into feedback.
    pub fn from_matches(text: &str, matches: &[GrammarMatch]) -> Self {
        let corrections = matches.iter().map(GrammarMatch::render).collect();

        let mut suggestions = Vec::new();
        if text.split_whitespace().count() > FULL_SENTENCE_MIN_WORDS {
            suggestions.push(FULL_SENTENCE_PRAISE.to_string());
        }

        Self {
            corrections,
            suggestions,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
