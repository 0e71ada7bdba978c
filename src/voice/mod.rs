//! Voice input and output
//!
//! The controllers ([`SpeechInput`], [`SpeechOutput`]) apply the assistant's
//! rules on top of pluggable backends ([`Recognizer`], [`Synthesizer`]). The
//! bundled backends capture from the microphone and play on the speakers,
//! with transcription and synthesis done by OpenAI-compatible APIs.

mod capture;
mod cloud;
mod input;
mod mic;
mod output;
mod playback;
mod stt;
mod tts;
mod wake_word;

pub use capture::{AudioCapture, SAMPLE_RATE, probe_input, rms, samples_to_wav};
pub use cloud::CloudSynthesizer;
pub use input::{
    Backoff, ERROR_BACKOFF, ErrorDisposition, NETWORK_BACKOFF, RecognitionError,
    RecognitionErrorKind, RecognitionEvent, Recognizer, SpeechInput,
};
pub use mic::{MicRecognizer, SegmentState, UtteranceSegmenter};
pub use output::{
    HINDI_LANG, Prosody, SpeechOutput, SynthesisEvent, Synthesizer, Utterance, UtteranceId, Voice,
    select_voice,
};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, PlaybackOutcome, decode_mp3};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
pub use wake_word::{Classification, WakeWordDetector};
