//! Text-to-speech (TTS) via an OpenAI-compatible speech API

use secrecy::{ExposeSecret, SecretString};

use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Speed range accepted by the speech API
const SPEED_RANGE: (f32, f32) = (0.25, 4.0);

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    default_voice: String,
}

impl TextToSpeech {
    /// Create a client from voice configuration
    #[must_use]
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/audio/speech", config.tts_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.tts_model.clone(),
            default_voice: config.tts_voice.clone(),
        }
    }

    /// Synthesize text to MP3 audio
    ///
    /// # Arguments
    ///
    /// * `text` - Text to synthesize
    /// * `voice` - Voice identifier, or `None` for the configured default
    /// * `speed` - Rate multiplier (clamped to what the API accepts)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str, voice: Option<&str>, speed: f32) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: voice.unwrap_or(&self.default_voice),
            speed: speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1),
            response_format: "mp3",
        };

        let mut http = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }

        let response = http.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("speech API error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), voice = request.voice, "speech synthesized");
        Ok(audio.to_vec())
    }
}
