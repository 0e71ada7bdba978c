//! Speech API synthesizer with local speaker playback
//!
//! Configured voice names are passed to the speech API as voice identifiers.
//! The API has no pitch control, so pitch is advisory here; rate maps to the
//! API's speed and volume is applied at playback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::output::{SynthesisEvent, Synthesizer, Utterance, UtteranceId, Voice};
use super::playback::{AudioPlayback, PlaybackOutcome, decode_mp3};
use super::tts::TextToSpeech;
use crate::{Error, Result};

struct Playing {
    id: UtteranceId,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// [`Synthesizer`] that renders speech remotely and plays it on the speakers
pub struct CloudSynthesizer {
    tts: Arc<TextToSpeech>,
    voices: Vec<Voice>,
    events: mpsc::UnboundedSender<SynthesisEvent>,
    playing: Option<Playing>,
}

impl CloudSynthesizer {
    /// Create a synthesizer that reports on `events`
    #[must_use]
    pub fn new(
        tts: TextToSpeech,
        voices: Vec<Voice>,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Self {
        Self {
            tts: Arc::new(tts),
            voices,
            events,
            playing: None,
        }
    }
}

impl Synthesizer for CloudSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn is_speaking(&self) -> bool {
        self.playing
            .as_ref()
            .is_some_and(|p| !p.task.is_finished() && !p.cancel.load(Ordering::Relaxed))
    }

    fn cancel(&mut self) {
        if let Some(playing) = self.playing.take() {
            tracing::debug!(id = %playing.id, "cancelling utterance");
            playing.cancel.store(true, Ordering::Relaxed);
        }
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.cancel();

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| Error::Tts(e.to_string()))?;

        let id = utterance.id;
        let cancel = Arc::new(AtomicBool::new(false));
        let task = runtime.spawn(render(
            Arc::clone(&self.tts),
            utterance,
            self.events.clone(),
            Arc::clone(&cancel),
        ));

        self.playing = Some(Playing { id, cancel, task });
        Ok(())
    }
}

/// Synthesize, play and report one utterance
///
/// `Ended` is always sent, so a failed utterance still releases the
/// assistant from the speaking state.
async fn render(
    tts: Arc<TextToSpeech>,
    utterance: Utterance,
    events: mpsc::UnboundedSender<SynthesisEvent>,
    cancel: Arc<AtomicBool>,
) {
    let id = utterance.id;

    if let Err(e) = play(&tts, utterance, &events, &cancel).await {
        tracing::error!(id = %id, error = %e, "speech output failed");
    }

    let _ = events.send(SynthesisEvent::Ended(id));
}

async fn play(
    tts: &TextToSpeech,
    utterance: Utterance,
    events: &mpsc::UnboundedSender<SynthesisEvent>,
    cancel: &Arc<AtomicBool>,
) -> Result<()> {
    let voice = utterance.voice.as_ref().map(|v| v.name.as_str());
    let mp3 = tts
        .synthesize(&utterance.text, voice, utterance.prosody.rate)
        .await?;

    if cancel.load(Ordering::Relaxed) {
        return Ok(());
    }

    let samples = decode_mp3(&mp3)?;
    let volume = utterance.prosody.volume.clamp(0.0, 1.0);

    let _ = events.send(SynthesisEvent::Started(utterance.id));

    let cancel = Arc::clone(cancel);
    let outcome = tokio::task::spawn_blocking(move || {
        AudioPlayback::open()?.play_blocking(samples, volume, &cancel)
    })
    .await
    .map_err(|e| Error::Audio(e.to_string()))??;

    if outcome == PlaybackOutcome::Cancelled {
        tracing::debug!(id = %utterance.id, "playback cancelled");
    }

    Ok(())
}
