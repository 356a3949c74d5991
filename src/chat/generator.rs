//! Core `ResponseGenerator` trait and `ApiGenerator` implementation.
//!
//! `ApiGenerator` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint. All connection details come from [`ChatConfig`]; the system
//! prompt is the one fixed piece (see [`crate::chat::prompt`]).

use async_trait::async_trait;
use thiserror::Error;

use crate::chat::prompt::build_messages;
use crate::config::ChatConfig;
use crate::transcript::Message;

// ---------------------------------------------------------------------------
// ChatError
// ---------------------------------------------------------------------------

/// Errors that can occur during reply generation.
///
/// Every variant is an upstream condition: callers recover locally with the
/// fixed fallback reply and never surface these as hard failures.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No API credential is configured; the request was not sent.
    #[error("no API credential configured for the inference service")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("inference request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse inference response: {0}")]
    Parse(String),

    /// The service returned a response with no usable reply text.
    #[error("inference service returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseGenerator trait
// ---------------------------------------------------------------------------

/// Async trait for reply generation against the committed history.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn ResponseGenerator>`).
///
/// # Arguments
/// * `history`    – Transcript content as it existed before the current
///                  turn.
/// * `user_input` – The new utterance, passed separately and never
///                  pre-inserted into `history`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, history: &[Message], user_input: &str) -> Result<String, ChatError>;
}

// ---------------------------------------------------------------------------
// ApiGenerator
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// The request carries the fixed French-partner system prompt, the
/// normalized history, and the new user message; the reply is the first
/// choice's content. Failures are never retried — the caller substitutes
/// the fallback reply instead.
pub struct ApiGenerator {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ApiGenerator {
    /// Build an `ApiGenerator` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`. A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &ChatConfig) -> Self {
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
impl ResponseGenerator for ApiGenerator {
    /// Send the assembled message list upstream and extract the reply.
    ///
    /// A missing credential fails the request with
    /// [`ChatError::MissingApiKey`] before anything is sent — the absence of
    /// a key degrades every turn to the fallback reply, never a crash.
    async fn generate(&self, history: &[Message], user_input: &str) -> Result<String, ChatError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ChatError::MissingApiKey)?;

        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages":    build_messages(history, user_input),
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ChatError::EmptyReply)?
            .trim()
            .to_string();

        if reply.is_empty() {
            return Err(ChatError::EmptyReply);
        }

        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> ChatConfig {
        ChatConfig {
            base_url: "http://localhost:9".into(),
            api_key: api_key.map(|s| s.to_string()),
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            timeout_secs: 1,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let config = make_config(None);
        let _generator = ApiGenerator::from_config(&config);
    }

    /// Without a credential, no request is sent and the error is
    /// `MissingApiKey`.
    #[tokio::test]
    async fn missing_api_key_fails_fast() {
        let generator = ApiGenerator::from_config(&make_config(None));
        let err = generator.generate(&[], "Bonjour").await.unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));
    }

    /// An empty credential string counts as absent.
    #[tokio::test]
    async fn empty_api_key_fails_fast() {
        let generator = ApiGenerator::from_config(&make_config(Some("")));
        let err = generator.generate(&[], "Bonjour").await.unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));
    }

    /// Verify that `ApiGenerator` is object-safe (usable as
    /// `dyn ResponseGenerator`).
    #[test]
    fn generator_is_object_safe() {
        let config = make_config(None);
        let generator: Box<dyn ResponseGenerator> = Box::new(ApiGenerator::from_config(&config));
        drop(generator);
    }

    #[test]
    fn chat_error_display_names_the_condition() {
        assert!(ChatError::MissingApiKey.to_string().contains("credential"));
        assert!(ChatError::Timeout.to_string().contains("timed out"));
        assert!(ChatError::EmptyReply.to_string().contains("empty"));
    }
}
