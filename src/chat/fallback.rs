//! Fallback generator — wraps any [`ResponseGenerator`] and substitutes the
//! fixed fallback reply on error.
//!
//! When the underlying call fails for any reason (`MissingApiKey`,
//! `Request`, `Timeout`, `Parse`, `EmptyReply`) [`FallbackGenerator`]
//! silently returns [`FALLBACK_REPLY`] instead of propagating the error.
//! The conversation keeps moving even when the inference service is
//! unreachable.

use async_trait::async_trait;

use crate::chat::generator::{ChatError, ResponseGenerator};
use crate::chat::prompt::FALLBACK_REPLY;
use crate::transcript::Message;

// ---------------------------------------------------------------------------
// FallbackGenerator
// ---------------------------------------------------------------------------

/// A transparent wrapper around any [`ResponseGenerator`] that never returns
/// an error — on failure the reply is [`FALLBACK_REPLY`].
pub struct FallbackGenerator<G: ResponseGenerator> {
    inner: G,
}

impl<G: ResponseGenerator> FallbackGenerator<G> {
    /// Wrap `inner` with fallback behaviour.
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    /// Return a reference to the wrapped generator.
    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: ResponseGenerator + Send + Sync> ResponseGenerator for FallbackGenerator<G> {
    /// Attempt generation; return the fixed fallback reply if any error
    /// occurs.
    ///
    /// This implementation **never** returns `Err(_)`.
    async fn generate(&self, history: &[Message], user_input: &str) -> Result<String, ChatError> {
        match self.inner.generate(history, user_input).await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                log::warn!("reply generation failed — substituting fallback reply: {err}");
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Always succeeds with a fixed reply.
    struct AlwaysOk(String);

    #[async_trait]
    impl ResponseGenerator for AlwaysOk {
        async fn generate(&self, _h: &[Message], _u: &str) -> Result<String, ChatError> {
            Ok(self.0.clone())
        }
    }

    /// Always returns the given error kind.
    struct AlwaysFails(ErrorKind);

    enum ErrorKind {
        MissingKey,
        Request,
        Timeout,
        Parse,
        Empty,
    }

    #[async_trait]
    impl ResponseGenerator for AlwaysFails {
        async fn generate(&self, _h: &[Message], _u: &str) -> Result<String, ChatError> {
            let err = match self.0 {
                ErrorKind::MissingKey => ChatError::MissingApiKey,
                ErrorKind::Request => ChatError::Request("connection refused".into()),
                ErrorKind::Timeout => ChatError::Timeout,
                ErrorKind::Parse => ChatError::Parse("bad json".into()),
                ErrorKind::Empty => ChatError::EmptyReply,
            };
            Err(err)
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn passes_through_success() {
        let generator = FallbackGenerator::new(AlwaysOk("Salut ! Ça va ?".into()));
        let reply = generator.generate(&[], "Bonjour").await.unwrap();
        assert_eq!(reply, "Salut ! Ça va ?");
    }

    #[tokio::test]
    async fn substitutes_fallback_on_request_error() {
        let generator = FallbackGenerator::new(AlwaysFails(ErrorKind::Request));
        let reply = generator.generate(&[], "Bonjour").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn substitutes_fallback_on_timeout() {
        let generator = FallbackGenerator::new(AlwaysFails(ErrorKind::Timeout));
        let reply = generator.generate(&[], "Bonjour").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn substitutes_fallback_on_parse_error() {
        let generator = FallbackGenerator::new(AlwaysFails(ErrorKind::Parse));
        let reply = generator.generate(&[], "Bonjour").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn substitutes_fallback_on_empty_reply() {
        let generator = FallbackGenerator::new(AlwaysFails(ErrorKind::Empty));
        let reply = generator.generate(&[], "Bonjour").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn substitutes_fallback_on_missing_key() {
        let generator = FallbackGenerator::new(AlwaysFails(ErrorKind::MissingKey));
        let reply = generator.generate(&[], "Bonjour").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn never_returns_err() {
        let generator = FallbackGenerator::new(AlwaysFails(ErrorKind::Timeout));
        assert!(generator.generate(&[], "test").await.is_ok());
    }

    /// FallbackGenerator<G> must itself be a valid ResponseGenerator
    /// (object-safe).
    #[test]
    fn fallback_is_object_safe() {
        let inner = AlwaysOk("ok".into());
        let _: Box<dyn ResponseGenerator> = Box::new(FallbackGenerator::new(inner));
    }
}
