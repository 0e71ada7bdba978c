//! Shared test utilities

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use friday_assistant::generation::TextGenerator;
use friday_assistant::voice::{
    RecognitionError, Recognizer, Synthesizer, Utterance, UtteranceId, Voice,
};
use friday_assistant::{Error, Result};

#[derive(Debug, Default)]
struct RecognizerState {
    starts: usize,
    aborts: usize,
    active: bool,
}

/// Handle onto a [`MockRecognizer`]'s call log
#[derive(Debug, Clone, Default)]
pub struct RecognizerLog(Arc<Mutex<RecognizerState>>);

impl RecognizerLog {
    pub fn starts(&self) -> usize {
        self.0.lock().unwrap().starts
    }

    pub fn aborts(&self) -> usize {
        self.0.lock().unwrap().aborts
    }

    pub fn is_active(&self) -> bool {
        self.0.lock().unwrap().active
    }

    /// Simulate the session closing on its own
    pub fn end_session(&self) {
        self.0.lock().unwrap().active = false;
    }
}

/// Recognizer that records calls; events are fed by the test
pub struct MockRecognizer(RecognizerLog);

impl MockRecognizer {
    pub fn new() -> (Self, RecognizerLog) {
        let log = RecognizerLog::default();
        (Self(log.clone()), log)
    }
}

impl Recognizer for MockRecognizer {
    fn start(&mut self) -> std::result::Result<(), RecognitionError> {
        let mut state = self.0.0.lock().unwrap();
        if state.active {
            return Err(RecognitionError::AlreadyStarted);
        }
        state.starts += 1;
        state.active = true;
        Ok(())
    }

    fn abort(&mut self) {
        let mut state = self.0.0.lock().unwrap();
        state.aborts += 1;
        state.active = false;
    }

    fn is_active(&self) -> bool {
        self.0.0.lock().unwrap().active
    }
}

#[derive(Debug, Default)]
struct SynthesizerState {
    spoken: Vec<Utterance>,
    cancels: usize,
    speaking: Option<UtteranceId>,
    failing: bool,
}

/// Handle onto a [`MockSynthesizer`]'s call log
#[derive(Debug, Clone, Default)]
pub struct SynthesizerLog(Arc<Mutex<SynthesizerState>>);

impl SynthesizerLog {
    pub fn spoken(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .spoken
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    /// ID of the most recent utterance
    pub fn last_id(&self) -> UtteranceId {
        self.0.lock().unwrap().spoken.last().unwrap().id
    }

    pub fn cancels(&self) -> usize {
        self.0.lock().unwrap().cancels
    }

    /// Simulate the current utterance finishing
    pub fn finish(&self) {
        self.0.lock().unwrap().speaking = None;
    }

    /// Make every following `speak` call fail
    pub fn fail_speak(&self, failing: bool) {
        self.0.lock().unwrap().failing = failing;
    }
}

/// Synthesizer that records utterances; events are fed by the test
pub struct MockSynthesizer {
    voices: Vec<Voice>,
    log: SynthesizerLog,
}

impl MockSynthesizer {
    pub fn new(voices: Vec<Voice>) -> (Self, SynthesizerLog) {
        let log = SynthesizerLog::default();
        (
            Self {
                voices,
                log: log.clone(),
            },
            log,
        )
    }
}

impl Synthesizer for MockSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn is_speaking(&self) -> bool {
        self.log.0.lock().unwrap().speaking.is_some()
    }

    fn cancel(&mut self) {
        let mut state = self.log.0.lock().unwrap();
        state.cancels += 1;
        state.speaking = None;
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let mut state = self.log.0.lock().unwrap();
        if state.failing {
            return Err(Error::Tts("no audio output".to_string()));
        }
        state.speaking = Some(utterance.id);
        state.spoken.push(utterance);
        Ok(())
    }
}

/// Generator that replies with a fixed text and counts calls
#[derive(Debug, Default)]
pub struct CountingGenerator {
    reply: String,
    calls: AtomicUsize,
}

impl CountingGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Generator that always fails
#[derive(Debug, Default)]
pub struct FailingGenerator {
    calls: AtomicUsize,
}

impl FailingGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Generation("connection refused".to_string()))
    }
}
