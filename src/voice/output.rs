//! Speech output controller
//!
//! Picks a voice, applies the assistant's fixed prosody and hands utterances
//! to a [`Synthesizer`]. At most one utterance is audible: a new request
//! cancels the current one instead of queueing behind it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Language tag applied when a Hindi voice is selected
pub const HINDI_LANG: &str = "hi-IN";

/// A voice offered by the synthesis backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Display name (e.g. "Google हिन्दी")
    pub name: String,
    /// BCP 47 locale tag (e.g. "hi-IN")
    pub lang: String,
}

impl Voice {
    /// Create a voice descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    fn is_hindi(&self) -> bool {
        self.lang.contains("hi") || self.name.contains("Hindi") || self.name.contains("Swara")
    }
}

/// Pick the preferred voice from what the backend offers
///
/// Preference order, first match wins:
/// 1. Google Hindi (by name, either script)
/// 2. Microsoft Swara
/// 3. Google US English
/// 4. any Hindi-locale voice with "Female" in its name
///
/// `None` means the backend default voice.
#[must_use]
pub fn select_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|v| v.name.contains("Google हिन्दी") || v.name.contains("Google Hindi"))
        .or_else(|| voices.iter().find(|v| v.name.contains("Microsoft Swara")))
        .or_else(|| voices.iter().find(|v| v.name.contains("Google US English")))
        .or_else(|| {
            voices.iter().find(|v| {
                (v.lang.contains("hi") || v.lang.contains("HI")) && v.name.contains("Female")
            })
        })
}

/// Pitch, rate and volume applied to every utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prosody {
    /// Pitch multiplier (1.0 = voice default)
    pub pitch: f32,
    /// Rate multiplier (1.0 = voice default)
    pub rate: f32,
    /// Volume, 0.0 to 1.0
    pub volume: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            pitch: 1.2,
            rate: 1.05,
            volume: 1.0,
        }
    }
}

/// Identifies one utterance across its start/end events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(u64);

impl UtteranceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A fully configured request to speak
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Identifier echoed back in [`SynthesisEvent`]s
    pub id: UtteranceId,
    /// Text to speak
    pub text: String,
    /// Voice to use (`None` = backend default)
    pub voice: Option<Voice>,
    /// Language override (`None` = voice default)
    pub lang: Option<String>,
    /// Prosody
    pub prosody: Prosody,
}

/// Lifecycle event of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// Audio output actually began
    Started(UtteranceId),
    /// Audio output finished or was cancelled
    Ended(UtteranceId),
}

/// A speech synthesis backend
///
/// Implementations deliver [`SynthesisEvent`]s on a channel handed to them at
/// construction. A cancelled utterance still reports `Ended`.
pub trait Synthesizer: Send {
    /// Voices currently available
    fn voices(&self) -> Vec<Voice>;

    /// Whether an utterance is pending or audible
    fn is_speaking(&self) -> bool;

    /// Stop the current utterance, if any
    fn cancel(&mut self);

    /// Queue an utterance for playback
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the utterance
    fn speak(&mut self, utterance: Utterance) -> Result<()>;
}

/// Applies voice policy on top of a [`Synthesizer`]
pub struct SpeechOutput {
    synthesizer: Box<dyn Synthesizer>,
    prosody: Prosody,
}

impl SpeechOutput {
    /// Wrap a synthesis backend
    #[must_use]
    pub fn new(synthesizer: Box<dyn Synthesizer>, prosody: Prosody) -> Self {
        Self {
            synthesizer,
            prosody,
        }
    }

    /// Speak `text`, preempting anything currently audible
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the utterance
    pub fn speak(&mut self, text: &str) -> Result<UtteranceId> {
        if self.synthesizer.is_speaking() {
            tracing::debug!("preempting current utterance");
            self.synthesizer.cancel();
        }

        let utterance = self.prepare(text);
        let id = utterance.id;

        tracing::debug!(
            id = %id,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()),
            text,
            "speaking"
        );

        self.synthesizer.speak(utterance)?;
        Ok(id)
    }

    /// Build the utterance for `text` against the current voice list
    #[must_use]
    pub fn prepare(&self, text: &str) -> Utterance {
        let voices = self.synthesizer.voices();
        let voice = select_voice(&voices).cloned();
        let lang = voice
            .as_ref()
            .filter(|v| v.is_hindi())
            .map(|_| HINDI_LANG.to_string());

        Utterance {
            id: UtteranceId::next(),
            text: text.to_string(),
            voice,
            lang,
            prosody: self.prosody,
        }
    }

    /// Stop whatever is being spoken
    pub fn cancel(&mut self) {
        self.synthesizer.cancel();
    }

    /// Whether an utterance is pending or audible
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.synthesizer.is_speaking()
    }

    /// Voices currently available
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        self.synthesizer.voices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices(list: &[(&str, &str)]) -> Vec<Voice> {
        list.iter().map(|(n, l)| Voice::new(*n, *l)).collect()
    }

    #[test]
    fn test_google_hindi_wins() {
        let list = voices(&[
            ("Google US English", "en-US"),
            ("Microsoft Swara - Hindi (India)", "hi-IN"),
            ("Google हिन्दी", "hi-IN"),
        ]);
        assert_eq!(select_voice(&list).unwrap().name, "Google हिन्दी");
    }

    #[test]
    fn test_swara_before_us_english() {
        let list = voices(&[
            ("Google US English", "en-US"),
            ("Microsoft Swara Online", "hi-IN"),
        ]);
        assert_eq!(select_voice(&list).unwrap().name, "Microsoft Swara Online");
    }

    #[test]
    fn test_hindi_female_fallback() {
        let list = voices(&[("Daniel", "en-GB"), ("Lekha Female", "hi-IN")]);
        assert_eq!(select_voice(&list).unwrap().name, "Lekha Female");

        let list = voices(&[("Daniel", "en-GB"), ("Lekha", "hi-IN")]);
        assert!(select_voice(&list).is_none());
    }

    #[test]
    fn test_default_prosody() {
        let prosody = Prosody::default();
        assert!((prosody.pitch - 1.2).abs() < f32::EPSILON);
        assert!((prosody.rate - 1.05).abs() < f32::EPSILON);
        assert!((prosody.volume - 1.0).abs() < f32::EPSILON);
    }
}
