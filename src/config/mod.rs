//! Configuration management for the FRIDAY assistant
//!
//! Values are layered: environment > TOML file > persona > default.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::voice::{Backoff, Prosody, Voice};
use crate::{Error, Persona, Result};

/// Default OpenAI-compatible API base URL
const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Active persona
    pub persona: Persona,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Restart timing
    pub timing: TimingConfig,

    /// Remote text generation
    pub generation: GenerationConfig,

    /// Connectivity probe
    pub connectivity: ConnectivityConfig,

    /// Turn the master switch on at startup
    pub start_active: bool,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Recognition locale
    pub locale: String,

    /// Transcription API base URL
    pub stt_url: String,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// Speech API base URL
    pub tts_url: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// Backend default voice
    pub tts_voice: String,

    /// Voices offered to the voice selection policy
    pub voices: Vec<Voice>,

    /// Prosody applied to every utterance
    pub prosody: Prosody,

    /// Longest single recognition session
    pub max_session: Duration,

    /// Key for the STT and TTS APIs
    pub api_key: Option<SecretString>,
}

/// Restart timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Delay between end of speech and the next recognition session
    ///
    /// Gives the audio backend time to release the microphone.
    pub resume_delay: Duration,

    /// Restart delays after recognition errors
    pub backoff: Backoff,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resume_delay: Duration::from_millis(100),
            backoff: Backoff::default(),
        }
    }
}

/// Remote text generation configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Chat-completions API base URL
    pub api_url: String,

    /// Model identifier
    pub model: String,

    /// API key
    pub api_key: Option<SecretString>,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds (`None` = no timeout)
    pub timeout_ms: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.8,
            timeout_ms: None,
        }
    }
}

/// Connectivity probe configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityConfig {
    /// URL probed to decide online/offline
    pub probe_url: String,

    /// Probe interval
    pub interval: Duration,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: "https://www.google.com/generate_204".to_string(),
            interval: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config or persona file cannot be loaded
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path)?;
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if the persona cannot be loaded or the result is invalid
    pub fn from_sources(
        fc: file::FridayConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env_parse = |key: &str| env(key).and_then(|v| v.parse::<u64>().ok());

        // Persona (env > toml > built-in)
        let mut persona = match env("FRIDAY_PERSONA").or(fc.persona) {
            Some(path) => Persona::load(&PathBuf::from(path))?,
            None => Persona::default(),
        };
        if let Some(wake_word) = env("FRIDAY_WAKE_WORD").or(fc.wake_word) {
            persona.wake_words = vec![wake_word];
        }
        if persona.wake_word().is_none_or(|w| w.trim().is_empty()) {
            return Err(Error::Config("a wake word is required".to_string()));
        }

        // One key serves LLM, STT and TTS unless overridden
        let api_key = env("OPENAI_API_KEY").or(fc.api_keys.openai);
        let llm_key = env("FRIDAY_LLM_API_KEY").or_else(|| api_key.clone());

        let defaults = Prosody::default();
        let prosody = Prosody {
            pitch: fc.voice.pitch.unwrap_or(defaults.pitch),
            rate: fc.voice.rate.unwrap_or(defaults.rate),
            volume: fc.voice.volume.unwrap_or(defaults.volume).clamp(0.0, 1.0),
        };

        let voice = VoiceConfig {
            locale: env("FRIDAY_LOCALE")
                .or(fc.voice.locale)
                .unwrap_or_else(|| "en-IN".to_string()),
            stt_url: env("FRIDAY_STT_URL")
                .or(fc.voice.stt_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            stt_model: env("FRIDAY_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_url: env("FRIDAY_TTS_URL")
                .or(fc.voice.tts_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            tts_model: env("FRIDAY_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env("FRIDAY_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "nova".to_string()),
            voices: fc.voice.voices.unwrap_or_default(),
            prosody,
            max_session: Duration::from_secs(fc.voice.max_session_secs.unwrap_or(10).max(1)),
            api_key: api_key.map(SecretString::from),
        };

        let default_timing = TimingConfig::default();
        let millis = |env_key: &str, file_value: Option<u64>, default: Duration| {
            env_parse(env_key)
                .or(file_value)
                .map_or(default, Duration::from_millis)
        };
        let timing = TimingConfig {
            resume_delay: millis(
                "FRIDAY_RESUME_DELAY_MS",
                fc.timing.resume_delay_ms,
                default_timing.resume_delay,
            ),
            backoff: Backoff {
                network: millis(
                    "FRIDAY_NETWORK_BACKOFF_MS",
                    fc.timing.network_backoff_ms,
                    default_timing.backoff.network,
                ),
                other: millis(
                    "FRIDAY_ERROR_BACKOFF_MS",
                    fc.timing.error_backoff_ms,
                    default_timing.backoff.other,
                ),
            },
        };

        let default_generation = GenerationConfig::default();
        let generation = GenerationConfig {
            api_url: env("FRIDAY_LLM_URL")
                .or(fc.llm.api_url)
                .unwrap_or(default_generation.api_url),
            model: env("FRIDAY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(default_generation.model),
            api_key: llm_key.map(SecretString::from),
            temperature: fc.llm.temperature.unwrap_or(default_generation.temperature),
            timeout_ms: env_parse("FRIDAY_LLM_TIMEOUT_MS").or(fc.llm.timeout_ms),
        };

        let default_connectivity = ConnectivityConfig::default();
        let connectivity = ConnectivityConfig {
            probe_url: env("FRIDAY_PROBE_URL")
                .or(fc.network.probe_url)
                .unwrap_or(default_connectivity.probe_url),
            interval: fc
                .network
                .probe_interval_secs
                .map_or(default_connectivity.interval, |s| Duration::from_secs(s.max(1))),
        };

        let start_active = env("FRIDAY_START_ACTIVE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(fc.start_active)
            .unwrap_or(false);

        Ok(Self {
            persona,
            voice,
            timing,
            generation,
            connectivity,
            start_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(file::FridayConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.persona.wake_word(), Some("friday"));
        assert_eq!(config.voice.locale, "en-IN");
        assert_eq!(config.timing.resume_delay, Duration::from_millis(100));
        assert_eq!(config.timing.backoff.network, Duration::from_millis(2000));
        assert_eq!(config.timing.backoff.other, Duration::from_millis(500));
        assert!(config.generation.api_key.is_none());
        assert!(!config.start_active);
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: file::FridayConfigFile = toml::from_str(
            r#"
            wake_word = "jarvis"
            [timing]
            resume_delay_ms = 300
            [llm]
            model = "file-model"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_from(&[
                ("FRIDAY_LLM_MODEL", "env-model"),
                ("OPENAI_API_KEY", "sk-test"),
                ("FRIDAY_START_ACTIVE", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(config.persona.wake_word(), Some("jarvis"));
        assert_eq!(config.timing.resume_delay, Duration::from_millis(300));
        assert_eq!(config.generation.model, "env-model");
        assert_eq!(
            config.generation.api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-test")
        );
        assert!(config.start_active);
    }

    #[test]
    fn test_blank_wake_word_rejected() {
        let result = Config::from_sources(
            file::FridayConfigFile::default(),
            env_from(&[("FRIDAY_WAKE_WORD", "  ")]),
        );
        assert!(result.is_err());
    }
}
