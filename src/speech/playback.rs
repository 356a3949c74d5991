//! Speech playback adapter.
//!
//! [`PlaybackEngine`] is the host synthesizer boundary. [`SpeechPlayback`]
//! guarantees at most one active utterance: a new `speak` cancels the one in
//! progress, and a cancelled utterance never produces a completion event —
//! its handle resolves to [`PlaybackOutcome::Cancelled`], which consumers
//! treat as silence, not completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::SpeechConfig;
use crate::speech::SpeechError;

// ---------------------------------------------------------------------------
// PlaybackParams
// ---------------------------------------------------------------------------

/// Synthesis parameters handed to the engine with every utterance.
#[derive(Debug, Clone)]
pub struct PlaybackParams {
    /// BCP-47 tag of the synthesis language.
    pub language: String,
    /// Rate relative to the engine default.
    pub rate: f32,
    /// Prefer a French-tagged voice when the host offers one, otherwise the
    /// engine default voice.
    pub prefer_french_voice: bool,
}

impl From<&SpeechConfig> for PlaybackParams {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            language: config.language.clone(),
            rate: config.playback_rate,
            prefer_french_voice: config.prefer_french_voice,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackOutcome
// ---------------------------------------------------------------------------

/// Terminal event of one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The utterance was spoken to the end.
    Finished,
    /// The utterance was cancelled; this is not a completion event.
    Cancelled,
    /// The engine failed mid-utterance.
    Failed(String),
}

// ---------------------------------------------------------------------------
// PlaybackEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the host speech synthesizer.
///
/// # Contract
///
/// - `speak` resolves when the utterance finishes, is cancelled, or fails —
///   exactly once per call.
/// - `cancel` stops the audio of the in-flight utterance immediately; its
///   `speak` call resolves with [`PlaybackOutcome::Cancelled`].
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// `true` when the host provides a usable synthesizer.
    fn is_supported(&self) -> bool;

    /// Speak `text` with `params` and resolve with the terminal outcome.
    async fn speak(&self, text: &str, params: &PlaybackParams) -> PlaybackOutcome;

    /// Stop the in-flight utterance immediately.
    fn cancel(&self);
}

// ---------------------------------------------------------------------------
// PlaybackHandle
// ---------------------------------------------------------------------------

/// Resolves to the terminal outcome of one utterance.
#[derive(Debug)]
pub struct PlaybackHandle {
    rx: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackHandle {
    /// Wait for the utterance's terminal event.
    pub async fn recv(&mut self) -> PlaybackOutcome {
        (&mut self.rx)
            .await
            .unwrap_or(PlaybackOutcome::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// SpeechPlayback
// ---------------------------------------------------------------------------

/// Adapter over a [`PlaybackEngine`] enforcing at most one active utterance.
pub struct SpeechPlayback {
    engine: Arc<dyn PlaybackEngine>,
    in_flight: Arc<AtomicUsize>,
    params: PlaybackParams,
}

impl SpeechPlayback {
    /// Wrap `engine`, speaking with the configured voice parameters.
    pub fn new(engine: Arc<dyn PlaybackEngine>, config: &SpeechConfig) -> Self {
        Self {
            engine,
            in_flight: Arc::new(AtomicUsize::new(0)),
            params: PlaybackParams::from(config),
        }
    }

    /// Speak one utterance, cancelling any utterance already in progress.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Unsupported`] — no synthesizer on this host.
    pub fn speak(&self, text: &str) -> Result<PlaybackHandle, SpeechError> {
        if !self.engine.is_supported() {
            return Err(SpeechError::Unsupported);
        }
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.engine.cancel();
        }

        let (tx, rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        let in_flight = Arc::clone(&self.in_flight);
        let params = self.params.clone();
        let text = text.to_string();

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let outcome = engine.speak(&text, &params).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            // Receiver may be gone when the utterance was superseded.
            let _ = tx.send(outcome);
        });

        Ok(PlaybackHandle { rx })
    }

    /// Stop the in-flight utterance immediately.
    ///
    /// Idempotent: cancelling an idle adapter is a no-op and fires no event.
    pub fn cancel(&self) {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.engine.cancel();
        }
    }

    /// `true` while an utterance is in flight.
    pub fn is_active(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

// ---------------------------------------------------------------------------
// MockPlaybackEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double recording spoken texts, finishing either immediately or on
/// manual release.
#[cfg(test)]
pub struct MockPlaybackEngine {
    supported: bool,
    auto_finish: bool,
    finish: tokio::sync::Notify,
    cancelled: tokio::sync::Notify,
    spoken: std::sync::Mutex<Vec<String>>,
    cancels: AtomicUsize,
}

#[cfg(test)]
impl MockPlaybackEngine {
    /// Every utterance finishes as soon as it starts.
    pub fn immediate() -> Self {
        Self::build(true, true)
    }

    /// Utterances stay in flight until [`release`](Self::release) or a
    /// cancellation.
    pub fn gated() -> Self {
        Self::build(true, false)
    }

    /// An engine absent from the host.
    pub fn unsupported() -> Self {
        Self::build(false, true)
    }

    fn build(supported: bool, auto_finish: bool) -> Self {
        Self {
            supported,
            auto_finish,
            finish: tokio::sync::Notify::new(),
            cancelled: tokio::sync::Notify::new(),
            spoken: std::sync::Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
        }
    }

    /// Let the gated in-flight utterance finish normally.
    pub fn release(&self) {
        self.finish.notify_one();
    }

    /// Texts the engine was asked to speak, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// How many times `cancel` was called.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl PlaybackEngine for MockPlaybackEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn speak(&self, text: &str, _params: &PlaybackParams) -> PlaybackOutcome {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.auto_finish {
            return PlaybackOutcome::Finished;
        }
        tokio::select! {
            _ = self.finish.notified() => PlaybackOutcome::Finished,
            _ = self.cancelled.notified() => PlaybackOutcome::Cancelled,
        }
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
