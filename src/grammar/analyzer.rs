//! Core `GrammarAnalyzer` trait and `ApiAnalyzer` implementation.
//!
//! `ApiAnalyzer` posts the utterance urlencoded to a LanguageTool-style
//! check endpoint and renders the match list into [`Feedback`]. It holds no
//! state between calls, so consecutive turns can never contaminate each
//! other's feedback.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GrammarConfig;
use crate::grammar::feedback::{Feedback, GrammarMatch};

// ---------------------------------------------------------------------------
// GrammarError
// ---------------------------------------------------------------------------

/// Errors that can occur during grammar analysis.
///
/// All of them degrade the turn's feedback to empty; none blocks the reply.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("grammar request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse grammar response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GrammarError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GrammarError::Timeout
        } else {
            GrammarError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// GrammarAnalyzer trait
// ---------------------------------------------------------------------------

/// Async trait for grammar analysis of one user utterance.
///
/// Implementors must be `Send + Sync` and stateless across calls: the
/// feedback computed for one turn must be unaffected by any other turn.
#[async_trait]
pub trait GrammarAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Feedback, GrammarError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Top-level payload of the check endpoint.
#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<GrammarMatch>,
}

// ---------------------------------------------------------------------------
// ApiAnalyzer
// ---------------------------------------------------------------------------

/// Calls a LanguageTool-style `/v2/check` endpoint.
///
/// The request is `application/x-www-form-urlencoded` with `text` and
/// `language` fields; the endpoint and language come from [`GrammarConfig`].
pub struct ApiAnalyzer {
    client: reqwest::Client,
    config: GrammarConfig,
}

impl ApiAnalyzer {
    /// Build an `ApiAnalyzer` from application config.
    pub fn from_config(config: &GrammarConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl GrammarAnalyzer for ApiAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Feedback, GrammarError> {
        let form = [
            ("text", text),
            ("language", self.config.language.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&form)
            .send()
            .await?;

        let check: CheckResponse = response
            .json()
            .await
            .map_err(|e| GrammarError::Parse(e.to_string()))?;

        Ok(Feedback::from_matches(text, &check.matches))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
