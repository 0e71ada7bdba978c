//! Speech input controller
//!
//! The recognition backend only supports single-shot sessions with interim
//! results. Continuous listening is simulated by restarting a session every
//! time one ends; the restart decision belongs to the orchestrator.

use std::fmt;
use std::time::Duration;

use crate::assistant::AssistantState;

/// Backoff before restarting after a recognition network error
pub const NETWORK_BACKOFF: Duration = Duration::from_millis(2000);

/// Backoff before restarting after any other recoverable error
pub const ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Error kinds reported by a recognition session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecognitionErrorKind {
    /// No speech was detected before the session timed out
    NoSpeech,
    /// The session was aborted on request
    Aborted,
    /// Audio capture failed
    AudioCapture,
    /// Network communication with the recognition service failed
    Network,
    /// Microphone permission denied
    NotAllowed,
    /// Recognition service denied
    ServiceNotAllowed,
    /// Grammar rejected
    BadGrammar,
    /// Locale not supported
    LanguageNotSupported,
    /// Anything else
    Other(String),
}

impl RecognitionErrorKind {
    /// Parse the platform name of an error (e.g. `"no-speech"`)
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "bad-grammar" => Self::BadGrammar,
            "language-not-supported" => Self::LanguageNotSupported,
            other => Self::Other(other.to_string()),
        }
    }

    /// Platform name of this error
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::BadGrammar => "bad-grammar",
            Self::LanguageNotSupported => "language-not-supported",
            Self::Other(name) => name,
        }
    }

    /// Decide how the orchestrator should react to this error
    ///
    /// Only `not-allowed` is fatal; `service-not-allowed` is retried like any
    /// other transient failure.
    #[must_use]
    pub const fn disposition(&self, backoff: &Backoff) -> ErrorDisposition {
        match self {
            Self::NoSpeech | Self::Aborted => ErrorDisposition::Ignore,
            Self::NotAllowed => ErrorDisposition::Fatal,
            Self::Network => ErrorDisposition::Retry(backoff.network),
            _ => ErrorDisposition::Retry(backoff.other),
        }
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do about a recognition error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Expected; the following session end drives the restart
    Ignore,
    /// Permission denied; switch the assistant off
    Fatal,
    /// Restart listening after the given delay
    Retry(Duration),
}

/// Restart delays after recognition errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after a network error
    pub network: Duration,
    /// Delay after any other recoverable error
    pub other: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            network: NETWORK_BACKOFF,
            other: ERROR_BACKOFF,
        }
    }
}

/// Event emitted by a recognition session
///
/// Per session the order is: zero or more `Interim`, an optional `Error`,
/// then exactly one `SessionEnded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Full partial transcript of the current session so far
    Interim(String),
    /// The session closed (end of speech, timeout or abort)
    SessionEnded,
    /// The session reported an error
    Error(RecognitionErrorKind),
}

/// Failure to start a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// A session is already running
    #[error("recognition already started")]
    AlreadyStarted,
    /// The backend could not start a session
    #[error("recognition failed to start: {0}")]
    Failed(String),
}

/// A single-shot speech recognition backend
///
/// Implementations deliver [`RecognitionEvent`]s on a channel handed to them
/// at construction.
pub trait Recognizer: Send {
    /// Begin a session
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::AlreadyStarted`] if a session is running
    fn start(&mut self) -> Result<(), RecognitionError>;

    /// Abort any in-progress session
    ///
    /// An aborted session still reports `Error(Aborted)` and `SessionEnded`.
    fn abort(&mut self);

    /// Whether a session is currently capturing audio
    fn is_active(&self) -> bool;
}

/// Guards a [`Recognizer`] with the assistant's start rules
pub struct SpeechInput {
    recognizer: Box<dyn Recognizer>,
}

impl SpeechInput {
    /// Wrap a recognition backend
    #[must_use]
    pub fn new(recognizer: Box<dyn Recognizer>) -> Self {
        Self { recognizer }
    }

    /// Start a session unless the assistant is talking or thinking
    ///
    /// Returns true if the backend was asked to start.
    pub fn start(&mut self, state: AssistantState) -> bool {
        if matches!(state, AssistantState::Speaking | AssistantState::Processing) {
            tracing::trace!(?state, "recognition start suppressed");
            return false;
        }

        match self.recognizer.start() {
            Ok(()) => {
                tracing::debug!("recognition session started");
            }
            Err(RecognitionError::AlreadyStarted) => {
                tracing::trace!("recognition already running");
            }
            Err(e) => {
                tracing::warn!(error = %e, "recognition start failed");
            }
        }
        true
    }

    /// Abort any in-progress session
    ///
    /// The caller is responsible for reporting `Idle`.
    pub fn stop(&mut self) {
        self.abort();
    }

    /// Abort any in-progress session without changing assistant state
    pub fn abort(&mut self) {
        if self.recognizer.is_active() {
            tracing::debug!("aborting recognition session");
        }
        self.recognizer.abort();
    }

    /// Whether a session is currently capturing audio
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.recognizer.is_active()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct Calls {
        starts: usize,
        aborts: usize,
        active: bool,
    }

    struct FakeRecognizer(Arc<Mutex<Calls>>);

    impl Recognizer for FakeRecognizer {
        fn start(&mut self) -> Result<(), RecognitionError> {
            let mut calls = self.0.lock().unwrap();
            calls.starts += 1;
            if calls.active {
                return Err(RecognitionError::AlreadyStarted);
            }
            calls.active = true;
            Ok(())
        }

        fn abort(&mut self) {
            let mut calls = self.0.lock().unwrap();
            calls.aborts += 1;
            calls.active = false;
        }

        fn is_active(&self) -> bool {
            self.0.lock().unwrap().active
        }
    }

    #[test]
    fn test_error_names_round_trip() {
        for name in ["no-speech", "aborted", "network", "not-allowed", "audio-capture"] {
            assert_eq!(RecognitionErrorKind::from_name(name).name(), name);
        }
        assert_eq!(
            RecognitionErrorKind::from_name("weird"),
            RecognitionErrorKind::Other("weird".to_string())
        );
    }

    #[test]
    fn test_error_disposition() {
        let backoff = Backoff::default();
        assert_eq!(
            RecognitionErrorKind::NoSpeech.disposition(&backoff),
            ErrorDisposition::Ignore
        );
        assert_eq!(
            RecognitionErrorKind::Aborted.disposition(&backoff),
            ErrorDisposition::Ignore
        );
        assert_eq!(
            RecognitionErrorKind::NotAllowed.disposition(&backoff),
            ErrorDisposition::Fatal
        );
        assert_eq!(
            RecognitionErrorKind::Network.disposition(&backoff),
            ErrorDisposition::Retry(Duration::from_millis(2000))
        );
        assert_eq!(
            RecognitionErrorKind::AudioCapture.disposition(&backoff),
            ErrorDisposition::Retry(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_start_suppressed_while_busy() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let mut input = SpeechInput::new(Box::new(FakeRecognizer(Arc::clone(&calls))));

        assert!(!input.start(AssistantState::Speaking));
        assert!(!input.start(AssistantState::Processing));
        assert_eq!(calls.lock().unwrap().starts, 0);

        assert!(input.start(AssistantState::Idle));
        assert!(input.is_active());
    }

    #[test]
    fn test_already_started_is_swallowed() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let mut input = SpeechInput::new(Box::new(FakeRecognizer(Arc::clone(&calls))));

        assert!(input.start(AssistantState::Idle));
        assert!(input.start(AssistantState::Listening));
        assert_eq!(calls.lock().unwrap().starts, 2);

        input.stop();
        assert!(!input.is_active());
        assert_eq!(calls.lock().unwrap().aborts, 1);
    }
}
