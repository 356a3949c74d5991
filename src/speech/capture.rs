//! Speech capture adapter.
//!
//! [`CaptureEngine`] is the host recognizer boundary: non-continuous,
//! single-result recognition in a fixed language. [`SpeechCapture`] enforces
//! the activation contract on top of any engine and hands the caller a
//! [`CaptureHandle`] that resolves to the activation's single terminal
//! outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::SpeechConfig;
use crate::speech::SpeechError;

// ---------------------------------------------------------------------------
// CaptureOutcome
// ---------------------------------------------------------------------------

/// The single terminal event of one capture activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A finalized utterance was recognized.
    Utterance(String),
    /// Recognition failed; the code is the engine's error identifier
    /// (e.g. `"no-speech"`, `"aborted"`).
    Failed(String),
}

// ---------------------------------------------------------------------------
// CaptureEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to the host speech recognizer.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn CaptureEngine>` and driven from the controller task.
///
/// # Contract
///
/// - `recognize` is single-shot: it resolves with exactly one
///   [`CaptureOutcome`] per call and never resolves twice.
/// - `halt` asks an in-flight recognition to finalize early; the in-flight
///   call still resolves (with whatever was recognized, or a failure code).
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    /// `true` when the host provides a usable recognizer.
    fn is_supported(&self) -> bool;

    /// Recognize one utterance in `language` and resolve with the terminal
    /// outcome.
    async fn recognize(&self, language: &str) -> CaptureOutcome;

    /// Request early finalization of an in-flight recognition.
    fn halt(&self);
}

// ---------------------------------------------------------------------------
// CaptureHandle
// ---------------------------------------------------------------------------

/// Resolves to the single terminal outcome of one activation.
#[derive(Debug)]
pub struct CaptureHandle {
    rx: oneshot::Receiver<CaptureOutcome>,
}

impl CaptureHandle {
    /// Wait for the activation's terminal event.
    ///
    /// A torn-down engine task (sender dropped) surfaces as
    /// `Failed("aborted")` rather than a panic.
    pub async fn recv(&mut self) -> CaptureOutcome {
        (&mut self.rx)
            .await
            .unwrap_or_else(|_| CaptureOutcome::Failed("aborted".into()))
    }
}

// ---------------------------------------------------------------------------
// SpeechCapture
// ---------------------------------------------------------------------------

/// Adapter over a [`CaptureEngine`] enforcing the activation contract.
pub struct SpeechCapture {
    engine: Arc<dyn CaptureEngine>,
    active: Arc<AtomicBool>,
    language: String,
}

impl SpeechCapture {
    /// Wrap `engine`, capturing in the configured language.
    pub fn new(engine: Arc<dyn CaptureEngine>, config: &SpeechConfig) -> Self {
        Self {
            engine,
            active: Arc::new(AtomicBool::new(false)),
            language: config.language.clone(),
        }
    }

    /// Begin one recognition.
    ///
    /// # Errors
    ///
    /// - [`SpeechError::Unsupported`] — no recognizer on this host.
    /// - [`SpeechError::AlreadyActive`] — an activation is outstanding; the
    ///   outstanding activation is unaffected.
    pub fn activate(&self) -> Result<CaptureHandle, SpeechError> {
        if !self.engine.is_supported() {
            return Err(SpeechError::Unsupported);
        }
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(SpeechError::AlreadyActive);
        }

        let (tx, rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active);
        let language = self.language.clone();

        tokio::spawn(async move {
            let outcome = engine.recognize(&language).await;
            active.store(false, Ordering::SeqCst);
            // Receiver may be gone when the session superseded this capture.
            let _ = tx.send(outcome);
        });

        Ok(CaptureHandle { rx })
    }

    /// Ask the in-flight recognition (if any) to finalize early.
    ///
    /// Idempotent: deactivating an inactive adapter is a no-op. The terminal
    /// event still arrives through the outstanding [`CaptureHandle`].
    pub fn deactivate(&self) {
        if self.active.load(Ordering::SeqCst) {
            self.engine.halt();
        }
    }

    /// `true` while an activation is outstanding.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// MockCaptureEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double with scripted outcomes and optional manual gating, so tests
/// can interleave commands with an unresolved recognition.
#[cfg(test)]
pub struct MockCaptureEngine {
    outcome: std::sync::Mutex<CaptureOutcome>,
    supported: bool,
    gated: bool,
    gate: tokio::sync::Notify,
    halt_requested: tokio::sync::Notify,
    halts: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockCaptureEngine {
    /// Resolve immediately with `Utterance(text)`.
    pub fn utterance(text: impl Into<String>) -> Self {
        Self::with_outcome(CaptureOutcome::Utterance(text.into()), false)
    }

    /// Resolve immediately with `Failed(code)`.
    pub fn failure(code: impl Into<String>) -> Self {
        Self::with_outcome(CaptureOutcome::Failed(code.into()), false)
    }

    /// Hold the recognition open until [`release`](Self::release) is called.
    pub fn gated_utterance(text: impl Into<String>) -> Self {
        Self::with_outcome(CaptureOutcome::Utterance(text.into()), true)
    }

    /// An engine absent from the host.
    pub fn unsupported() -> Self {
        let mut engine = Self::with_outcome(CaptureOutcome::Failed("unavailable".into()), false);
        engine.supported = false;
        engine
    }

    fn with_outcome(outcome: CaptureOutcome, gated: bool) -> Self {
        Self {
            outcome: std::sync::Mutex::new(outcome),
            supported: true,
            gated,
            gate: tokio::sync::Notify::new(),
            halt_requested: tokio::sync::Notify::new(),
            halts: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Let a gated recognition resolve with its scripted outcome.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// How many times `halt` was called.
    pub fn halt_count(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl CaptureEngine for MockCaptureEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn recognize(&self, _language: &str) -> CaptureOutcome {
        if self.gated {
            tokio::select! {
                _ = self.gate.notified() => {}
                _ = self.halt_requested.notified() => {
                    return CaptureOutcome::Failed("aborted".into());
                }
            }
        }
        self.outcome.lock().unwrap().clone()
    }

    fn halt(&self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
        self.halt_requested.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
