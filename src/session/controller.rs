//! Conversation controller — drives the capture → inference → playback loop.
//!
//! [`ConversationController`] owns the transcript and the session state and
//! responds to [`SessionCommand`]s received over a `tokio::sync::mpsc`
//! channel, publishing [`SessionEvent`]s on a second channel.
//!
//! # Turn flow
//!
//! ```text
//! SessionCommand::StartCapture
//!   └─▶ SpeechCapture::activate()                       [Capturing]
//!         ├─ Utterance(text) ──┐
//!         └─ Failed(code) ──▶ status + Idle
//!                             │
//! SessionCommand::SubmitText ─┤  (bypasses Capturing)
//!                             ▼
//!   GrammarAnalyzer ∥ ResponseGenerator                  [Processing]
//!         │   (history snapshot taken before the turn;
//!         │    failures degrade to empty feedback / fallback reply)
//!         ▼
//!   TranscriptStore::commit_turn  — atomic User/Assistant pair
//!         ├─ muted or playback unavailable ──▶ Idle
//!         └─ SpeechPlayback::speak                       [Speaking]
//!               └─ finished ──▶ Idle
//! ```
//!
//! While Capturing or Speaking the loop listens for further commands, so a
//! mute toggle or a new turn acts within one scheduling step; Processing is
//! awaited inline — there is no cancellation path for an in-flight remote
//! call, which bounds the session to one outstanding round-trip at a time.
//!
//! The controller task is the sole mutator of session state and transcript;
//! the capture and playback engines are exclusive session-wide resources it
//! never drives concurrently.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::chat::{ResponseGenerator, FALLBACK_REPLY};
use crate::grammar::{Feedback, GrammarAnalyzer};
use crate::speech::{
    CaptureHandle, CaptureOutcome, PlaybackHandle, PlaybackOutcome, SpeechCapture, SpeechError,
    SpeechPlayback,
};
use crate::transcript::{Message, TranscriptStore};

use super::state::SessionState;

// ---------------------------------------------------------------------------
// SessionCommand / SessionEvent
// ---------------------------------------------------------------------------

/// Commands sent from a presentation binding to the controller task.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Begin a spoken turn: activate capture for one utterance.
    StartCapture,
    /// Ask the in-flight capture to finalize early.
    StopCapture,
    /// Begin a typed turn with the given text.
    SubmitText(String),
    /// Flip the mute flag; muting cancels in-flight playback.
    ToggleMute,
}

/// Severity of a [`SessionEvent::Status`] message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

/// Events delivered from the controller to the presentation bindings.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session state machine moved to a new state.
    StateChanged(SessionState),
    /// Capture finalized an utterance; processing begins next.
    Utterance { text: String },
    /// A full turn committed: the user message (with feedback) and the
    /// assistant reply, in commit order.
    TurnCommitted { user: Message, assistant: Message },
    /// The reply started playing.
    PlaybackStarted,
    /// The reply finished playing. Never emitted for a cancelled utterance.
    PlaybackFinished,
    /// The mute flag changed.
    MuteChanged(bool),
    /// Transient user-visible status text.
    Status { kind: StatusKind, message: String },
}

// ---------------------------------------------------------------------------
// ConversationController
// ---------------------------------------------------------------------------

/// Orchestrates one conversation: sole owner and mutator of the session
/// state and the transcript.
///
/// Create with [`ConversationController::new`], optionally seed a greeting,
/// then call [`run`](Self::run) inside a tokio task.
pub struct ConversationController {
    transcript: TranscriptStore,
    capture: SpeechCapture,
    playback: SpeechPlayback,
    generator: Arc<dyn ResponseGenerator>,
    analyzer: Arc<dyn GrammarAnalyzer>,
    events: mpsc::Sender<SessionEvent>,
    state: SessionState,
    muted: bool,
    active_capture: Option<CaptureHandle>,
    active_playback: Option<PlaybackHandle>,
}

impl ConversationController {
    /// Create a new controller.
    ///
    /// # Arguments
    ///
    /// * `capture`     — speech capture adapter (exclusive session resource).
    /// * `playback`    — speech playback adapter (exclusive session resource).
    /// * `generator`   — remote reply client (e.g. wrapped in a fallback).
    /// * `analyzer`    — remote grammar client.
    /// * `events`      — channel to the presentation binding.
    /// * `start_muted` — initial mute flag.
    pub fn new(
        capture: SpeechCapture,
        playback: SpeechPlayback,
        generator: Arc<dyn ResponseGenerator>,
        analyzer: Arc<dyn GrammarAnalyzer>,
        events: mpsc::Sender<SessionEvent>,
        start_muted: bool,
    ) -> Self {
        Self {
            transcript: TranscriptStore::new(),
            capture,
            playback,
            generator,
            analyzer,
            events,
            state: SessionState::Idle,
            muted: start_muted,
            active_capture: None,
            active_playback: None,
        }
    }

    /// Seed the session-opening assistant greeting before the first turn.
    pub fn seed_greeting(&mut self, text: impl Into<String>) {
        self.transcript.push_greeting(text);
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current mute flag.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// The committed conversation history, read-only.
    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    /// Status-line label; shows "Muted" while idle with playback muted.
    pub fn display_label(&self) -> &'static str {
        if self.muted && self.state == SessionState::Idle {
            "Muted"
        } else {
            self.state.label()
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the controller until the command channel closes and every
    /// outstanding capture/playback operation has delivered its terminal
    /// event. Returns the controller for final inspection.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> Self {
        let mut open = true;

        loop {
            let capturing = self.active_capture.is_some();
            let speaking = self.active_playback.is_some();

            if !open && !capturing && !speaking {
                break;
            }

            tokio::select! {
                maybe_cmd = commands.recv(), if open => {
                    match maybe_cmd {
                        Some(cmd) => self.dispatch(cmd).await,
                        None => open = false,
                    }
                }
                outcome = wait_capture(&mut self.active_capture), if capturing => {
                    self.active_capture = None;
                    self.on_capture_outcome(outcome).await;
                }
                outcome = wait_playback(&mut self.active_playback), if speaking => {
                    self.active_playback = None;
                    self.on_playback_outcome(outcome).await;
                }
            }
        }

        log::info!("session: command channel closed, controller shutting down");
        self
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn dispatch(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::StartCapture => self.handle_start_capture().await,
            SessionCommand::StopCapture => self.capture.deactivate(),
            SessionCommand::SubmitText(text) => self.handle_submit(text).await,
            SessionCommand::ToggleMute => self.handle_toggle_mute().await,
        }
    }

    /// Begin a spoken turn. Starting a turn always cancels in-flight
    /// Speaking; a second activation while Capturing is rejected at the
    /// adapter boundary and leaves the first untouched.
    async fn handle_start_capture(&mut self) {
        if self.state == SessionState::Speaking {
            self.cancel_playback();
            self.set_state(SessionState::Idle).await;
        }

        match self.capture.activate() {
            Ok(handle) => {
                self.active_capture = Some(handle);
                self.set_state(SessionState::Capturing).await;
            }
            Err(SpeechError::AlreadyActive) => {
                self.status(StatusKind::Warning, "Capture already in progress")
                    .await;
            }
            Err(SpeechError::Unsupported) => {
                self.status(
                    StatusKind::Warning,
                    "Speech recognition not supported on this host",
                )
                .await;
            }
        }
    }

    /// Begin a typed turn, bypassing Capturing entirely.
    async fn handle_submit(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        if self.state == SessionState::Speaking {
            self.cancel_playback();
            self.set_state(SessionState::Idle).await;
        }
        if self.state == SessionState::Capturing {
            // A typed submission supersedes the pending capture.
            self.capture.deactivate();
            self.active_capture = None;
            self.set_state(SessionState::Idle).await;
        }

        self.run_turn(text).await;
    }

    async fn handle_toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.emit(SessionEvent::MuteChanged(self.muted)).await;

        // Muting while Speaking cancels immediately; unmuting has no
        // retroactive effect on committed turns.
        if self.muted && self.state == SessionState::Speaking {
            self.cancel_playback();
            self.set_state(SessionState::Idle).await;
        }
    }

    // -----------------------------------------------------------------------
    // Terminal-event handlers
    // -----------------------------------------------------------------------

    async fn on_capture_outcome(&mut self, outcome: CaptureOutcome) {
        match outcome {
            CaptureOutcome::Utterance(text) => {
                self.emit(SessionEvent::Utterance { text: text.clone() }).await;
                self.run_turn(text).await;
            }
            CaptureOutcome::Failed(code) => {
                self.status(StatusKind::Warning, format!("Erreur: {code}"))
                    .await;
                self.set_state(SessionState::Idle).await;
            }
        }
    }

    async fn on_playback_outcome(&mut self, outcome: PlaybackOutcome) {
        match outcome {
            PlaybackOutcome::Finished => {
                self.emit(SessionEvent::PlaybackFinished).await;
            }
            PlaybackOutcome::Cancelled => {
                // No completion event for a cancelled utterance.
            }
            PlaybackOutcome::Failed(err) => {
                self.status(StatusKind::Warning, format!("Playback failed: {err}"))
                    .await;
            }
        }
        if self.state == SessionState::Speaking {
            self.set_state(SessionState::Idle).await;
        }
    }

    // -----------------------------------------------------------------------
    // Turn processing
    // -----------------------------------------------------------------------

    /// Process one user utterance to a committed turn.
    ///
    /// The history snapshot is taken before the commit, so the generator
    /// always sees the transcript as it existed before this turn; the new
    /// utterance travels as a separate argument. The grammar and inference
    /// requests are independent — neither result gates the data sent to the
    /// other — and converge only when the pair is assembled.
    async fn run_turn(&mut self, text: String) {
        self.set_state(SessionState::Processing).await;

        let history = self.transcript.snapshot();

        let (feedback, reply) = tokio::join!(
            self.analyzer.analyze(&text),
            self.generator.generate(&history, &text),
        );

        let feedback = match feedback {
            Ok(feedback) => feedback,
            Err(err) => {
                log::warn!("session: grammar analysis failed ({err}); no feedback this turn");
                Feedback::default()
            }
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("session: reply generation failed ({err}); using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };

        let (user, assistant) = self.transcript.commit_turn(
            text,
            feedback.corrections,
            feedback.suggestions,
            reply,
        );
        self.emit(SessionEvent::TurnCommitted {
            user,
            assistant: assistant.clone(),
        })
        .await;

        if self.muted {
            self.set_state(SessionState::Idle).await;
            return;
        }

        match self.playback.speak(&assistant.text) {
            Ok(handle) => {
                self.active_playback = Some(handle);
                self.set_state(SessionState::Speaking).await;
                self.emit(SessionEvent::PlaybackStarted).await;
            }
            Err(SpeechError::Unsupported) => {
                // Playback silently disabled on this host.
                log::debug!("session: playback unavailable, turn ends at Idle");
                self.set_state(SessionState::Idle).await;
            }
            Err(err) => {
                self.fail(format!("playback refused the utterance: {err}"))
                    .await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn cancel_playback(&mut self) {
        self.playback.cancel();
        // Dropping the handle suppresses the cancelled utterance's
        // completion event.
        self.active_playback = None;
    }

    /// Surface an unrecoverable failure and recover to Idle — the session is
    /// never left stuck.
    async fn fail(&mut self, message: String) {
        log::error!("session error: {message}");
        self.set_state(SessionState::Error).await;
        self.status(StatusKind::Error, message).await;
        self.set_state(SessionState::Idle).await;
    }

    async fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            log::debug!("session: {} → {}", self.state.label(), next.label());
            self.state = next;
            self.emit(SessionEvent::StateChanged(next)).await;
        }
    }

    async fn status(&self, kind: StatusKind, message: impl Into<String>) {
        self.emit(SessionEvent::Status {
            kind,
            message: message.into(),
        })
        .await;
    }

    async fn emit(&self, event: SessionEvent) {
        // The binding may have gone away; the session itself keeps running.
        let _ = self.events.send(event).await;
    }
}

async fn wait_capture(slot: &mut Option<CaptureHandle>) -> CaptureOutcome {
    match slot {
        Some(handle) => handle.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_playback(slot: &mut Option<PlaybackHandle>) -> PlaybackOutcome {
    match slot {
        Some(handle) => handle.recv().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::sleep;

    use crate::chat::ChatError;
    use crate::config::SpeechConfig;
    use crate::grammar::{GrammarError, FULL_SENTENCE_PRAISE};
    use crate::speech::{MockCaptureEngine, MockPlaybackEngine};
    use crate::transcript::Speaker;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Generator that always succeeds with a fixed reply.
    struct OkGenerator(String);

    #[async_trait]
    impl ResponseGenerator for OkGenerator {
        async fn generate(&self, _h: &[Message], _u: &str) -> Result<String, ChatError> {
            Ok(self.0.clone())
        }
    }

    /// Generator that always fails, as if the network were down.
    struct FailGenerator;

    #[async_trait]
    impl ResponseGenerator for FailGenerator {
        async fn generate(&self, _h: &[Message], _u: &str) -> Result<String, ChatError> {
            Err(ChatError::Request("connection refused".into()))
        }
    }

    /// Generator that records the history it was called with.
    struct RecordingGenerator {
        histories: Mutex<Vec<Vec<String>>>,
        reply: String,
    }

    impl RecordingGenerator {
        fn new(reply: &str) -> Self {
            Self {
                histories: Mutex::new(Vec::new()),
                reply: reply.into(),
            }
        }

        fn histories(&self) -> Vec<Vec<String>> {
            self.histories.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResponseGenerator for RecordingGenerator {
        async fn generate(&self, history: &[Message], _u: &str) -> Result<String, ChatError> {
            self.histories
                .lock()
                .unwrap()
                .push(history.iter().map(|m| m.text.clone()).collect());
            Ok(self.reply.clone())
        }
    }

    /// Analyzer backed by a service that reports no matches.
    struct MatchlessAnalyzer;

    #[async_trait]
    impl GrammarAnalyzer for MatchlessAnalyzer {
        async fn analyze(&self, text: &str) -> Result<Feedback, GrammarError> {
            Ok(Feedback::from_matches(text, &[]))
        }
    }

    /// Analyzer whose feedback is derived only from the analyzed text.
    struct EchoAnalyzer;

    #[async_trait]
    impl GrammarAnalyzer for EchoAnalyzer {
        async fn analyze(&self, text: &str) -> Result<Feedback, GrammarError> {
            Ok(Feedback {
                corrections: vec![format!("corrigez: {text}")],
                suggestions: Vec::new(),
            })
        }
    }

    /// Analyzer that always fails.
    struct FailAnalyzer;

    #[async_trait]
    impl GrammarAnalyzer for FailAnalyzer {
        async fn analyze(&self, _text: &str) -> Result<Feedback, GrammarError> {
            Err(GrammarError::Timeout)
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    type Harness = (
        ConversationController,
        mpsc::Sender<SessionCommand>,
        mpsc::Receiver<SessionCommand>,
        mpsc::Receiver<SessionEvent>,
    );

    fn make_controller(
        capture_engine: Arc<MockCaptureEngine>,
        playback_engine: Arc<MockPlaybackEngine>,
        generator: Arc<dyn ResponseGenerator>,
        analyzer: Arc<dyn GrammarAnalyzer>,
        start_muted: bool,
    ) -> Harness {
        let config = SpeechConfig::default();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);

        let controller = ConversationController::new(
            SpeechCapture::new(capture_engine, &config),
            SpeechPlayback::new(playback_engine, &config),
            generator,
            analyzer,
            event_tx,
            start_muted,
        );

        (controller, cmd_tx, cmd_rx, event_rx)
    }

    fn drain(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn state_path(events: &[SessionEvent]) -> Vec<SessionState> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn count_finished(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, SessionEvent::PlaybackFinished))
            .count()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// A typed turn commits a User/Assistant pair and speaks the reply.
    #[tokio::test]
    async fn text_turn_commits_pair_and_speaks() {
        let playback = Arc::new(MockPlaybackEngine::immediate());
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::clone(&playback),
            Arc::new(OkGenerator("Salut ! Ça va ?".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText("Bonjour".into()))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let events = drain(&mut event_rx);

        assert_eq!(controller.transcript().len(), 2);
        let messages = controller.transcript().messages();
        assert_eq!(messages[0].speaker, Speaker::User);
        assert_eq!(messages[0].text, "Bonjour");
        assert_eq!(messages[1].speaker, Speaker::Assistant);
        assert_eq!(messages[1].text, "Salut ! Ça va ?");

        assert_eq!(
            state_path(&events),
            vec![
                SessionState::Processing,
                SessionState::Speaking,
                SessionState::Idle
            ]
        );
        assert_eq!(playback.spoken(), vec!["Salut ! Ça va ?".to_string()]);
        assert_eq!(count_finished(&events), 1);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    /// With no network, the reply is the fixed fallback string and the
    /// transcript still gains exactly two messages.
    #[tokio::test]
    async fn unreachable_service_falls_back() {
        let (controller, cmd_tx, cmd_rx, _event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(FailGenerator),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText("Bonjour".into()))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;

        assert_eq!(controller.transcript().len(), 2);
        assert_eq!(controller.transcript().messages()[1].text, FALLBACK_REPLY);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    /// A sentence of more than five words earns the full-sentence praise
    /// even when the grammar service reports no matches.
    #[tokio::test]
    async fn long_sentence_earns_praise() {
        let (controller, cmd_tx, cmd_rx, _event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Très bien !".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText(
                "Je suis en train d'apprendre le français".into(),
            ))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;

        let user = &controller.transcript().messages()[0];
        assert!(user.corrections.is_empty());
        assert_eq!(user.suggestions, vec![FULL_SENTENCE_PRAISE.to_string()]);
    }

    /// A spoken turn flows Capturing → Processing → Speaking → Idle.
    #[tokio::test]
    async fn capture_turn_flows_through_processing() {
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("Bonjour")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Salut !".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let events = drain(&mut event_rx);

        assert_eq!(
            state_path(&events),
            vec![
                SessionState::Capturing,
                SessionState::Processing,
                SessionState::Speaking,
                SessionState::Idle
            ]
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Utterance { text } if text == "Bonjour")));
        assert_eq!(controller.transcript().len(), 2);
    }

    /// A second StartCapture while the first is outstanding is rejected and
    /// the first activation's utterance is still processed.
    #[tokio::test]
    async fn second_capture_request_rejected() {
        let engine = Arc::new(MockCaptureEngine::gated_utterance("Bonjour"));
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::clone(&engine),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Salut !".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        let task = tokio::spawn(controller.run(cmd_rx));

        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        engine.release();
        drop(cmd_tx);

        let controller = task.await.unwrap();
        let events = drain(&mut event_rx);

        // Only one Capturing entry and one committed turn.
        let path = state_path(&events);
        assert_eq!(
            path.iter()
                .filter(|s| **s == SessionState::Capturing)
                .count(),
            1
        );
        assert_eq!(controller.transcript().len(), 2);
        assert_eq!(controller.transcript().messages()[0].text, "Bonjour");
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Status { kind: StatusKind::Warning, message }
                if message.contains("already in progress")
        )));
    }

    /// Scenario: mute enabled, complete a turn — the path never visits
    /// Speaking and nothing is spoken.
    #[tokio::test]
    async fn muted_turn_skips_speaking() {
        let playback = Arc::new(MockPlaybackEngine::immediate());
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("Bonjour")),
            Arc::clone(&playback),
            Arc::new(OkGenerator("Salut !".into())),
            Arc::new(MatchlessAnalyzer),
            true,
        );

        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let events = drain(&mut event_rx);

        assert_eq!(
            state_path(&events),
            vec![
                SessionState::Capturing,
                SessionState::Processing,
                SessionState::Idle
            ]
        );
        assert!(playback.spoken().is_empty());
        assert_eq!(controller.transcript().len(), 2);
        assert_eq!(controller.display_label(), "Muted");
    }

    /// Feedback for consecutive turns is derived from each turn's own text —
    /// no shared mutable state between analyses.
    #[tokio::test]
    async fn consecutive_feedback_is_independent() {
        let (controller, cmd_tx, cmd_rx, _event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("D'accord".into())),
            Arc::new(EchoAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText("premier tour".into()))
            .await
            .unwrap();
        cmd_tx
            .send(SessionCommand::SubmitText("deuxième tour".into()))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let messages = controller.transcript().messages();

        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0].corrections,
            vec!["corrigez: premier tour".to_string()]
        );
        assert_eq!(
            messages[2].corrections,
            vec!["corrigez: deuxième tour".to_string()]
        );
    }

    /// Muting while Speaking cancels playback within one scheduling step and
    /// suppresses the in-flight utterance's finished event.
    #[tokio::test]
    async fn mute_while_speaking_cancels_playback() {
        let playback = Arc::new(MockPlaybackEngine::gated());
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::clone(&playback),
            Arc::new(OkGenerator("Une longue réponse".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        let task = tokio::spawn(controller.run(cmd_rx));

        cmd_tx
            .send(SessionCommand::SubmitText("Bonjour".into()))
            .await
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        cmd_tx.send(SessionCommand::ToggleMute).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        drop(cmd_tx);

        let controller = task.await.unwrap();
        let events = drain(&mut event_rx);

        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.is_muted());
        assert_eq!(playback.cancel_count(), 1);
        assert_eq!(count_finished(&events), 0);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::MuteChanged(true))));
        assert_eq!(state_path(&events).last(), Some(&SessionState::Idle));
    }

    /// Starting a new turn while Speaking cancels the in-flight playback;
    /// Capturing and Speaking are never active together.
    #[tokio::test]
    async fn new_turn_cancels_speaking() {
        let playback = Arc::new(MockPlaybackEngine::gated());
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("Encore une question")),
            Arc::clone(&playback),
            Arc::new(OkGenerator("Réponse".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        let task = tokio::spawn(controller.run(cmd_rx));

        cmd_tx
            .send(SessionCommand::SubmitText("Bonjour".into()))
            .await
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        // First reply is mid-playback; a new spoken turn begins.
        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        // Let the second reply finish.
        playback.release();
        drop(cmd_tx);

        let controller = task.await.unwrap();
        let events = drain(&mut event_rx);

        assert_eq!(playback.cancel_count(), 1);
        assert_eq!(count_finished(&events), 1);
        assert_eq!(controller.transcript().len(), 4);
        assert_eq!(
            state_path(&events),
            vec![
                SessionState::Processing,
                SessionState::Speaking,
                SessionState::Idle,
                SessionState::Capturing,
                SessionState::Processing,
                SessionState::Speaking,
                SessionState::Idle,
            ]
        );
    }

    /// StopCapture with no utterance produced reports a recognition error
    /// and returns to Idle without committing anything.
    #[tokio::test]
    async fn stop_capture_without_utterance_returns_idle() {
        let engine = Arc::new(MockCaptureEngine::gated_utterance("never"));
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::clone(&engine),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Réponse".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        let task = tokio::spawn(controller.run(cmd_rx));

        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        cmd_tx.send(SessionCommand::StopCapture).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        drop(cmd_tx);

        let controller = task.await.unwrap();
        let events = drain(&mut event_rx);

        assert_eq!(
            state_path(&events),
            vec![SessionState::Capturing, SessionState::Idle]
        );
        assert!(controller.transcript().is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Status { kind: StatusKind::Warning, message }
                if message.contains("aborted")
        )));
    }

    /// An absent capture engine surfaces a status and leaves state untouched.
    #[tokio::test]
    async fn unsupported_capture_surfaces_status() {
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::unsupported()),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Réponse".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx.send(SessionCommand::StartCapture).await.unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let events = drain(&mut event_rx);

        assert!(state_path(&events).is_empty());
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.transcript().is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Status { kind: StatusKind::Warning, message }
                if message.contains("not supported")
        )));
    }

    /// With playback unavailable the turn still commits and goes straight to
    /// Idle.
    #[tokio::test]
    async fn unavailable_playback_goes_straight_to_idle() {
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::unsupported()),
            Arc::new(OkGenerator("Réponse".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText("Bonjour".into()))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let events = drain(&mut event_rx);

        assert_eq!(
            state_path(&events),
            vec![SessionState::Processing, SessionState::Idle]
        );
        assert_eq!(controller.transcript().len(), 2);
    }

    /// Blank text submissions are ignored entirely.
    #[tokio::test]
    async fn blank_submission_is_ignored() {
        let (controller, cmd_tx, cmd_rx, mut event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Réponse".into())),
            Arc::new(MatchlessAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText("   ".into()))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;
        let events = drain(&mut event_rx);

        assert!(events.is_empty());
        assert!(controller.transcript().is_empty());
    }

    /// The generator receives the history as it existed before the turn;
    /// the new utterance is never pre-inserted.
    #[tokio::test]
    async fn generator_receives_history_before_turn() {
        let generator = Arc::new(RecordingGenerator::new("Réponse"));
        let (mut controller, cmd_tx, cmd_rx, _event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::clone(&generator) as Arc<dyn ResponseGenerator>,
            Arc::new(MatchlessAnalyzer),
            false,
        );
        controller.seed_greeting("Bonjour!");

        cmd_tx
            .send(SessionCommand::SubmitText("premier".into()))
            .await
            .unwrap();
        cmd_tx
            .send(SessionCommand::SubmitText("deuxième".into()))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;

        let histories = generator.histories();
        assert_eq!(histories.len(), 2);
        assert_eq!(histories[0], vec!["Bonjour!".to_string()]);
        assert_eq!(
            histories[1],
            vec![
                "Bonjour!".to_string(),
                "premier".to_string(),
                "Réponse".to_string()
            ]
        );
        assert_eq!(controller.transcript().len(), 5);
    }

    /// Grammar failure degrades to empty feedback without blocking the reply.
    #[tokio::test]
    async fn grammar_failure_degrades_to_empty_feedback() {
        let (controller, cmd_tx, cmd_rx, _event_rx) = make_controller(
            Arc::new(MockCaptureEngine::utterance("unused")),
            Arc::new(MockPlaybackEngine::immediate()),
            Arc::new(OkGenerator("Réponse".into())),
            Arc::new(FailAnalyzer),
            false,
        );

        cmd_tx
            .send(SessionCommand::SubmitText(
                "Je suis en train d'apprendre le français".into(),
            ))
            .await
            .unwrap();
        drop(cmd_tx);

        let controller = controller.run(cmd_rx).await;

        let user = &controller.transcript().messages()[0];
        assert!(user.corrections.is_empty());
        assert!(user.suggestions.is_empty());
        assert_eq!(controller.transcript().messages()[1].text, "Réponse");
    }
}
