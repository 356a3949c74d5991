//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SessionMode
// ---------------------------------------------------------------------------

/// Selects how user turns are captured.
///
/// | Variant | Turn input                                  |
/// |---------|---------------------------------------------|
/// | Text    | Typed lines; capture engine never activated |
/// | Audio   | Speech capture wired to every turn          |
///
/// Both modes speak replies aloud unless muted (or playback is unavailable
/// on the host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Typed conversation with spoken replies.
    Text,
    /// Fully spoken conversation.
    Audio,
}

impl Default for SessionMode {
    fn default() -> Self {
        Self::Text
    }
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Settings for the remote reply-generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the chat-completions endpoint.
    pub base_url: String,
    /// API credential. `None` means every request fails upstream and the
    /// conversation degrades to the fixed fallback reply — never a crash.
    /// `AppConfig::load` fills this from `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a reply before timing out.
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            timeout_secs: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// GrammarConfig
// ---------------------------------------------------------------------------

/// Settings for the remote grammar-checking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Full URL of the grammar-check endpoint (LanguageTool wire format).
    pub endpoint: String,
    /// Language code submitted with every check.
    pub language: String,
    /// Maximum seconds to wait for a check before timing out.
    pub timeout_secs: u64,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.languagetool.org/v2/check".into(),
            language: "fr".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the host speech capture/playback engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// BCP-47 tag used for both recognition and synthesis.
    pub language: String,
    /// Playback rate relative to the engine default (0.8 – 0.9 keeps the
    /// synthesized French easy to follow for a learner).
    pub playback_rate: f32,
    /// Prefer a French-tagged synthesis voice when the host offers one.
    pub prefer_french_voice: bool,
    /// Start the session with spoken replies muted.
    pub start_muted: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "fr-FR".into(),
            playback_rate: 0.85,
            prefer_french_voice: true,
            start_muted: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use french_buddy::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Selected session mode.
    pub mode: SessionMode,
    /// Remote reply-generation settings.
    pub chat: ChatConfig,
    /// Remote grammar-check settings.
    pub grammar: GrammarConfig,
    /// Speech capture/playback settings.
    pub speech: SpeechConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            chat: ChatConfig::default(),
            grammar: GrammarConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file. When the file leaves `chat.api_key` unset, the `OPENAI_API_KEY`
    /// environment variable fills it.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&AppPaths::new().settings_file)?;
        if config.chat.api_key.is_none() {
            config.chat.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.is_empty());
        }
        Ok(config)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
