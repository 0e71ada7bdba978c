//! Microphone recognizer
//!
//! Each session opens the microphone, waits for one utterance delimited by an
//! energy gate, transcribes it and reports the text as a single interim
//! result followed by the session end.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
use super::input::{RecognitionError, RecognitionErrorKind, RecognitionEvent, Recognizer};
use super::stt::SpeechToText;
use crate::Result;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Silence that ends an utterance (0.8s at 16kHz)
const END_SILENCE_SAMPLES: usize = 12800;

/// Capture poll interval
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Progress of the utterance segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// No speech yet
    Waiting,
    /// Speech heard, accumulating
    Speaking,
    /// Enough speech followed by enough silence
    Complete,
}

/// Splits a sample stream into one utterance using an energy gate
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmentState,
    speech: Vec<f32>,
    silence: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    /// Create an empty segmenter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmentState::Waiting,
            speech: Vec::new(),
            silence: 0,
        }
    }

    /// Feed a block of samples and return the new state
    pub fn push(&mut self, samples: &[f32]) -> SegmentState {
        if samples.is_empty() || self.state == SegmentState::Complete {
            return self.state;
        }

        let energy = rms(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmentState::Waiting => {
                if is_speech {
                    tracing::trace!(energy, "speech onset");
                    self.state = SegmentState::Speaking;
                    self.speech.extend_from_slice(samples);
                }
            }
            SegmentState::Speaking => {
                self.speech.extend_from_slice(samples);
                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence > END_SILENCE_SAMPLES {
                    if self.speech.len() > MIN_SPEECH_SAMPLES + self.silence {
                        self.state = SegmentState::Complete;
                    } else {
                        // A click or cough, not speech
                        tracing::trace!("discarding short noise burst");
                        self.reset();
                    }
                }
            }
            SegmentState::Complete => {}
        }

        self.state
    }

    /// Whether any speech has been heard
    #[must_use]
    pub const fn heard_speech(&self) -> bool {
        !matches!(self.state, SegmentState::Waiting)
    }

    /// Take the accumulated utterance
    pub fn take(&mut self) -> Vec<f32> {
        let speech = std::mem::take(&mut self.speech);
        self.reset();
        speech
    }

    fn reset(&mut self) {
        self.state = SegmentState::Waiting;
        self.speech.clear();
        self.silence = 0;
    }
}

/// Result of capturing one session's audio
enum Captured {
    Speech(Vec<f32>),
    Silence,
    Aborted,
}

struct Session {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// [`Recognizer`] backed by the default microphone and a transcription API
pub struct MicRecognizer {
    stt: Arc<SpeechToText>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    max_session: Duration,
    session: Option<Session>,
}

impl MicRecognizer {
    /// Create a recognizer that reports on `events`
    #[must_use]
    pub fn new(
        stt: SpeechToText,
        events: mpsc::UnboundedSender<RecognitionEvent>,
        max_session: Duration,
    ) -> Self {
        Self {
            stt: Arc::new(stt),
            events,
            max_session,
            session: None,
        }
    }
}

impl Recognizer for MicRecognizer {
    fn start(&mut self) -> std::result::Result<(), RecognitionError> {
        if self.is_active() {
            return Err(RecognitionError::AlreadyStarted);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RecognitionError::Failed(e.to_string()))?;

        let cancel = Arc::new(AtomicBool::new(false));
        let task = runtime.spawn(run_session(
            Arc::clone(&self.stt),
            self.events.clone(),
            Arc::clone(&cancel),
            self.max_session,
        ));

        self.session = Some(Session { cancel, task });
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.store(true, Ordering::Relaxed);
        }
    }

    fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }
}

async fn run_session(
    stt: Arc<SpeechToText>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
    cancel: Arc<AtomicBool>,
    max_session: Duration,
) {
    let emit = |event: RecognitionEvent| {
        // Receiver gone means the assistant is shutting down
        let _ = events.send(event);
    };

    let capture_cancel = Arc::clone(&cancel);
    let captured = tokio::task::spawn_blocking(move || capture_utterance(&capture_cancel, max_session))
        .await
        .map_err(|e| crate::Error::Audio(e.to_string()))
        .and_then(|r| r);

    match captured {
        Ok(Captured::Speech(samples)) if !cancel.load(Ordering::Relaxed) => {
            match transcribe(&stt, &samples).await {
                Ok(_) if cancel.load(Ordering::Relaxed) => {
                    emit(RecognitionEvent::Error(RecognitionErrorKind::Aborted));
                }
                Ok(text) if text.is_empty() => {
                    emit(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
                }
                Ok(text) => emit(RecognitionEvent::Interim(text)),
                Err(e) => {
                    tracing::warn!(error = %e, "transcription failed");
                    emit(RecognitionEvent::Error(RecognitionErrorKind::Network));
                }
            }
        }
        Ok(Captured::Speech(_) | Captured::Aborted) => {
            emit(RecognitionEvent::Error(RecognitionErrorKind::Aborted));
        }
        Ok(Captured::Silence) => {
            emit(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
        }
        Err(e) => {
            tracing::error!(error = %e, "audio capture failed");
            emit(RecognitionEvent::Error(RecognitionErrorKind::AudioCapture));
        }
    }

    emit(RecognitionEvent::SessionEnded);
}

async fn transcribe(stt: &SpeechToText, samples: &[f32]) -> Result<String> {
    let wav = samples_to_wav(samples, SAMPLE_RATE)?;
    stt.transcribe(&wav).await
}

/// Capture until one utterance completes, the session times out or aborts
fn capture_utterance(cancel: &AtomicBool, max_session: Duration) -> Result<Captured> {
    let mut capture = AudioCapture::open()?;
    capture.start()?;

    let started = Instant::now();
    let mut segmenter = UtteranceSegmenter::new();

    loop {
        std::thread::sleep(POLL_INTERVAL);

        if cancel.load(Ordering::Relaxed) {
            return Ok(Captured::Aborted);
        }

        if segmenter.push(&capture.take_buffer()) == SegmentState::Complete {
            let speech = segmenter.take();
            tracing::debug!(samples = speech.len(), "utterance captured");
            return Ok(Captured::Speech(speech));
        }

        if started.elapsed() >= max_session {
            return Ok(if segmenter.heard_speech() {
                Captured::Speech(segmenter.take())
            } else {
                Captured::Silence
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn tone(seconds: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * seconds) as usize;
        (0..n)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn silence(seconds: f32) -> Vec<f32> {
        vec![0.0; (SAMPLE_RATE as f32 * seconds) as usize]
    }

    #[test]
    fn test_silence_never_starts() {
        let mut segmenter = UtteranceSegmenter::new();
        assert_eq!(segmenter.push(&silence(2.0)), SegmentState::Waiting);
        assert!(!segmenter.heard_speech());
    }

    #[test]
    fn test_speech_then_silence_completes() {
        let mut segmenter = UtteranceSegmenter::new();
        assert_eq!(segmenter.push(&tone(0.6)), SegmentState::Speaking);
        assert_eq!(segmenter.push(&silence(0.5)), SegmentState::Speaking);
        assert_eq!(segmenter.push(&silence(0.5)), SegmentState::Complete);

        let utterance = segmenter.take();
        assert_eq!(utterance.len(), tone(0.6).len() + silence(1.0).len());
        assert!(!segmenter.heard_speech());
    }

    #[test]
    fn test_short_burst_is_discarded() {
        let mut segmenter = UtteranceSegmenter::new();
        segmenter.push(&tone(0.1));
        assert_eq!(segmenter.push(&silence(1.0)), SegmentState::Waiting);
        assert!(segmenter.take().is_empty());
    }
}
