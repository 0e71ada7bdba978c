//! TOML configuration file loading
//!
//! Supports `~/.config/friday/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::voice::Voice;
use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct FridayConfigFile {
    /// Path to a persona JSON file
    #[serde(default)]
    pub persona: Option<String>,

    /// Override the persona's wake word
    #[serde(default)]
    pub wake_word: Option<String>,

    /// Turn the master switch on at startup
    #[serde(default)]
    pub start_active: Option<bool>,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Restart timing
    #[serde(default)]
    pub timing: TimingFileConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Connectivity probe configuration
    #[serde(default)]
    pub network: NetworkFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Recognition locale (e.g. "en-IN")
    pub locale: Option<String>,

    /// Transcription API base URL
    pub stt_url: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Speech API base URL
    pub tts_url: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// Backend default voice (e.g. "nova")
    pub tts_voice: Option<String>,

    /// Voices offered to the voice selection policy
    pub voices: Option<Vec<Voice>>,

    /// Pitch multiplier
    pub pitch: Option<f32>,

    /// Rate multiplier
    pub rate: Option<f32>,

    /// Volume, 0.0 to 1.0
    pub volume: Option<f32>,

    /// Longest single recognition session, in seconds
    pub max_session_secs: Option<u64>,
}

/// Restart timing configuration (milliseconds)
#[derive(Debug, Default, Deserialize)]
pub struct TimingFileConfig {
    /// Delay between end of speech and the next recognition session
    pub resume_delay_ms: Option<u64>,

    /// Restart delay after a recognition network error
    pub network_backoff_ms: Option<u64>,

    /// Restart delay after other recognition errors
    pub error_backoff_ms: Option<u64>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Chat-completions API base URL
    pub api_url: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Request timeout in milliseconds (unset = none)
    pub timeout_ms: Option<u64>,
}

/// Connectivity probe configuration
#[derive(Debug, Default, Deserialize)]
pub struct NetworkFileConfig {
    /// URL probed to decide online/offline
    pub probe_url: Option<String>,

    /// Probe interval in seconds
    pub probe_interval_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    /// Key for the LLM, STT and TTS APIs
    pub openai: Option<String>,
}

/// Load the TOML config file
///
/// An explicit path must exist and parse. The default path is optional: a
/// missing or unparsable file falls back to defaults.
///
/// # Errors
///
/// Returns error if an explicitly given file cannot be read or parsed
pub fn load_config_file(explicit: Option<&Path>) -> Result<FridayConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(FridayConfigFile::default());
    };

    if !path.exists() {
        return Ok(FridayConfigFile::default());
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                FridayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            FridayConfigFile::default()
        }
    };

    Ok(config)
}

/// Return the config file path: `~/.config/friday/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("friday").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let config: FridayConfigFile = toml::from_str(
            r#"
            wake_word = "jarvis"

            [voice]
            pitch = 1.0
            voices = [{ name = "Google हिन्दी", lang = "hi-IN" }]

            [timing]
            resume_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.wake_word.as_deref(), Some("jarvis"));
        assert_eq!(config.voice.pitch, Some(1.0));
        assert_eq!(config.voice.voices.unwrap()[0].lang, "hi-IN");
        assert_eq!(config.timing.resume_delay_ms, Some(250));
        assert!(config.llm.model.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config_file(Some(&missing)).is_err());
    }
}
