//! Application entry point — French conversation practice in the terminal.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the reply generator ([`ApiGenerator`] wrapped in
//!    [`FallbackGenerator`]) and the grammar analyzer ([`ApiAnalyzer`]).
//! 4. Build the speech adapters. The terminal host has no speech engines, so
//!    both sides are backed by unavailable stubs: capture requests surface a
//!    status message and replies simply skip the Speaking phase.
//! 5. Create the command/event channels and spawn
//!    [`ConversationController::run`] on the runtime.
//! 6. Run the console loop for the configured [`SessionMode`] — blocks until
//!    stdin closes or the user quits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use french_buddy::{
    chat::{ApiGenerator, FallbackGenerator, ResponseGenerator},
    config::{AppConfig, SessionMode},
    grammar::{ApiAnalyzer, GrammarAnalyzer},
    mode::{AudioSession, TextSession, AUDIO_GREETING, LEARNING_TIPS, QUICK_PHRASES, TEXT_GREETING},
    session::{ConversationController, SessionCommand, SessionEvent, StatusKind},
    speech::{
        CaptureEngine, CaptureOutcome, PlaybackEngine, PlaybackOutcome, PlaybackParams,
        SpeechCapture, SpeechPlayback,
    },
};

// ---------------------------------------------------------------------------
// Unavailable host engines
// ---------------------------------------------------------------------------

/// Capture stub for hosts without a speech recognizer: every activation is
/// rejected as unsupported, so the feature stays silently disabled.
struct UnavailableCapture;

#[async_trait]
impl CaptureEngine for UnavailableCapture {
    fn is_supported(&self) -> bool {
        false
    }

    async fn recognize(&self, _language: &str) -> CaptureOutcome {
        CaptureOutcome::Failed("unavailable".into())
    }

    fn halt(&self) {}
}

/// Playback stub for hosts without a speech synthesizer.
struct UnavailablePlayback;

#[async_trait]
impl PlaybackEngine for UnavailablePlayback {
    fn is_supported(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str, _params: &PlaybackParams) -> PlaybackOutcome {
        PlaybackOutcome::Failed("unavailable".into())
    }

    fn cancel(&self) {}
}

// ---------------------------------------------------------------------------
// Event rendering
// ---------------------------------------------------------------------------

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Utterance { text } => {
            println!("Vous avez dit: \"{text}\"");
        }
        SessionEvent::TurnCommitted { user, assistant } => {
            for correction in &user.corrections {
                println!("  ⚠️  Correction: {correction}");
            }
            for suggestion in &user.suggestions {
                println!("  💡 Suggestion: {suggestion}");
            }
            println!("🤖 {}", assistant.text);
        }
        SessionEvent::Status { kind, message } => match kind {
            StatusKind::Info => println!("· {message}"),
            StatusKind::Warning | StatusKind::Error => eprintln!("! {message}"),
        },
        SessionEvent::MuteChanged(muted) => {
            println!("· {}", if *muted { "Réponses muettes" } else { "Réponses vocales" });
        }
        // State transitions and playback progress drive indicators in a
        // graphical binding; the console stays quiet about them.
        SessionEvent::StateChanged(_)
        | SessionEvent::PlaybackStarted
        | SessionEvent::PlaybackFinished => {}
    }
}

fn print_sidebar() {
    println!("Tips for learning:");
    for tip in LEARNING_TIPS {
        println!("  {tip}");
    }
    println!("Quick phrases:");
    for phrase in QUICK_PHRASES {
        println!("  {phrase}");
    }
}

// ---------------------------------------------------------------------------
// Console loops
// ---------------------------------------------------------------------------

/// Typed conversation: every non-command line is a turn.
async fn run_text_console(mut session: TextSession) -> anyhow::Result<()> {
    println!("🇫🇷 French Conversational Buddy — tapez votre message en français.");
    println!("Commands: /mute  /tips  /quit");
    println!("🤖 {TEXT_GREETING}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(line) => match line.trim() {
                        "" => {}
                        "/quit" => break,
                        "/mute" => session.toggle_mute().await,
                        "/tips" => print_sidebar(),
                        text => session.submit(text).await,
                    },
                }
            }
            event = session.next_event() => {
                match event {
                    Some(event) => print_event(&event),
                    None => break,
                }
            }
        }
    }

    Ok(())
}

/// Spoken conversation: an empty line toggles a capture turn.
async fn run_audio_console(mut session: AudioSession) -> anyhow::Result<()> {
    println!("🎙️ Audio French Practice — press Enter to speak, Enter again to stop.");
    println!("Commands: /mute  /quit");
    println!("🤖 {AUDIO_GREETING}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut listening = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(line) => match line.trim() {
                        "/quit" => break,
                        "/mute" => session.toggle_mute().await,
                        "" => {
                            if listening {
                                session.stop_turn().await;
                            } else {
                                session.start_turn().await;
                            }
                            listening = !listening;
                        }
                        // Spoken mode still accepts nothing else; remind the
                        // user how to drive it.
                        _ => println!("· Press Enter to talk, /quit to leave"),
                    },
                }
            }
            event = session.next_event() => {
                match event {
                    Some(event) => {
                        if matches!(event, SessionEvent::TurnCommitted { .. } | SessionEvent::Status { .. }) {
                            listening = false;
                        }
                        print_event(&event);
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("French Conversational Buddy starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    if config.chat.api_key.is_none() {
        log::warn!("No inference credential configured; replies will use the fallback text");
    }

    // 3. Remote clients
    let generator: Arc<dyn ResponseGenerator> = Arc::new(FallbackGenerator::new(
        ApiGenerator::from_config(&config.chat),
    ));
    let analyzer: Arc<dyn GrammarAnalyzer> = Arc::new(ApiAnalyzer::from_config(&config.grammar));

    // 4. Speech adapters over the (absent) host engines
    let capture = SpeechCapture::new(Arc::new(UnavailableCapture), &config.speech);
    let playback = SpeechPlayback::new(Arc::new(UnavailablePlayback), &config.speech);

    // 5. Controller task
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(16);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(32);

    let mut controller = ConversationController::new(
        capture,
        playback,
        generator,
        analyzer,
        event_tx,
        config.speech.start_muted,
    );
    controller.seed_greeting(match config.mode {
        SessionMode::Text => TEXT_GREETING,
        SessionMode::Audio => AUDIO_GREETING,
    });

    tokio::spawn(async move {
        controller.run(cmd_rx).await;
    });

    // 6. Console loop
    match config.mode {
        SessionMode::Text => run_text_console(TextSession::new(cmd_tx, event_rx)).await,
        SessionMode::Audio => run_audio_console(AudioSession::new(cmd_tx, event_rx)).await,
    }
}
